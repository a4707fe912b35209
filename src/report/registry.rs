//! Static table of supported report configurations.
//!
//! Keyed by `<sp|sb|sd>_<report_type>`. Each entry carries what the Reporting
//! v3 create call needs (report type id, grouping, time unit, filters and
//! metric columns) plus the limits Amazon enforces for that report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ReportError;

/// Advertising product a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdType {
    SponsoredProducts,
    SponsoredBrands,
    SponsoredDisplay,
}

impl AdType {
    pub const ALL: [AdType; 3] = [
        AdType::SponsoredProducts,
        AdType::SponsoredBrands,
        AdType::SponsoredDisplay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdType::SponsoredProducts => "SPONSORED_PRODUCTS",
            AdType::SponsoredBrands => "SPONSORED_BRANDS",
            AdType::SponsoredDisplay => "SPONSORED_DISPLAY",
        }
    }

    /// Short registry prefix: sp, sb or sd
    pub fn prefix(self) -> &'static str {
        match self {
            AdType::SponsoredProducts => "sp",
            AdType::SponsoredBrands => "sb",
            AdType::SponsoredDisplay => "sd",
        }
    }
}

impl std::str::FromStr for AdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s) || t.prefix().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown ad type: {}", s))
    }
}

/// Report dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Campaign,
    AdGroup,
    Ad,
    Keywords,
    Targets,
    Targeting,
    AdvertisedProducts,
    PurchasedProducts,
    SearchTerm,
}

impl ReportType {
    pub const ALL: [ReportType; 9] = [
        ReportType::Campaign,
        ReportType::AdGroup,
        ReportType::Ad,
        ReportType::Keywords,
        ReportType::Targets,
        ReportType::Targeting,
        ReportType::AdvertisedProducts,
        ReportType::PurchasedProducts,
        ReportType::SearchTerm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Campaign => "campaign",
            ReportType::AdGroup => "ad_group",
            ReportType::Ad => "ad",
            ReportType::Keywords => "keywords",
            ReportType::Targets => "targets",
            ReportType::Targeting => "targeting",
            ReportType::AdvertisedProducts => "advertised_products",
            ReportType::PurchasedProducts => "purchased_products",
            ReportType::SearchTerm => "search_term",
        }
    }
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown report type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Daily,
    Summary,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Daily => "DAILY",
            TimeUnit::Summary => "SUMMARY",
        }
    }

    /// Date columns Amazon adds for this granularity
    fn date_columns(self) -> &'static [&'static str] {
        match self {
            TimeUnit::Daily => &["date"],
            TimeUnit::Summary => &["startDate", "endDate"],
        }
    }
}

/// One `configuration.filters` entry
pub struct Filter {
    pub field: &'static str,
    pub values: &'static [&'static str],
}

pub struct ReportDefinition {
    pub key: &'static str,
    pub table_name: &'static str,
    pub ad_type: AdType,
    pub report_type: ReportType,
    pub report_type_id: &'static str,
    pub time_unit: TimeUnit,
    pub group_by: &'static [&'static str],
    pub filters: &'static [Filter],
    pub metrics: &'static [&'static str],
    pub data_retention_days: i64,
    pub max_date_range_days: i64,
}

const SP_RETENTION: i64 = 95;
const SB_RETENTION: i64 = 60;
const SD_RETENTION: i64 = 65;
const MAX_RANGE: i64 = 31;

const KEYWORD_FILTER: &[Filter] = &[Filter {
    field: "keywordType",
    values: &["BROAD", "PHRASE", "EXACT"],
}];

const TARGET_FILTER: &[Filter] = &[Filter {
    field: "keywordType",
    values: &["TARGETING_EXPRESSION", "TARGETING_EXPRESSION_PREDEFINED"],
}];

#[rustfmt::skip]
pub static REGISTRY: &[ReportDefinition] = &[
    ReportDefinition {
        key: "sp_campaign",
        table_name: "sp_campaign",
        ad_type: AdType::SponsoredProducts,
        report_type: ReportType::Campaign,
        report_type_id: "spCampaigns",
        time_unit: TimeUnit::Daily,
        group_by: &["campaign"],
        filters: &[],
        metrics: &[
            "campaignName", "campaignId", "campaignStatus", "campaignBudgetAmount",
            "campaignBudgetType", "impressions", "clicks", "cost", "costPerClick",
            "clickThroughRate", "purchases7d", "sales7d", "unitsSoldClicks7d",
        ],
        data_retention_days: SP_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sp_ad_group",
        table_name: "sp_ad_group",
        ad_type: AdType::SponsoredProducts,
        report_type: ReportType::AdGroup,
        report_type_id: "spCampaigns",
        time_unit: TimeUnit::Daily,
        group_by: &["campaign", "adGroup"],
        filters: &[],
        metrics: &[
            "campaignName", "campaignId", "adGroupName", "adGroupId", "impressions",
            "clicks", "cost", "purchases7d", "sales7d",
        ],
        data_retention_days: SP_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sp_keywords",
        table_name: "sp_keywords",
        ad_type: AdType::SponsoredProducts,
        report_type: ReportType::Keywords,
        report_type_id: "spTargeting",
        time_unit: TimeUnit::Daily,
        group_by: &["targeting"],
        filters: KEYWORD_FILTER,
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "keywordId", "keyword",
            "matchType", "keywordBid", "impressions", "clicks", "cost", "purchases7d",
            "sales7d", "acosClicks7d", "roasClicks7d",
        ],
        data_retention_days: SP_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sp_targets",
        table_name: "sp_targets",
        ad_type: AdType::SponsoredProducts,
        report_type: ReportType::Targets,
        report_type_id: "spTargeting",
        time_unit: TimeUnit::Daily,
        group_by: &["targeting"],
        filters: TARGET_FILTER,
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "keywordId", "targeting",
            "keywordType", "impressions", "clicks", "cost", "purchases7d", "sales7d",
        ],
        data_retention_days: SP_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sp_search_term",
        table_name: "sp_search_term",
        ad_type: AdType::SponsoredProducts,
        report_type: ReportType::SearchTerm,
        report_type_id: "spSearchTerm",
        time_unit: TimeUnit::Daily,
        group_by: &["searchTerm"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "keywordId", "keyword",
            "matchType", "searchTerm", "impressions", "clicks", "cost", "purchases7d",
            "sales7d",
        ],
        data_retention_days: SP_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sp_advertised_products",
        table_name: "sp_advertised_products",
        ad_type: AdType::SponsoredProducts,
        report_type: ReportType::AdvertisedProducts,
        report_type_id: "spAdvertisedProduct",
        time_unit: TimeUnit::Daily,
        group_by: &["advertiser"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "adId", "advertisedAsin",
            "advertisedSku", "impressions", "clicks", "cost", "purchases7d", "sales7d",
            "unitsSoldClicks7d",
        ],
        data_retention_days: SP_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sp_purchased_products",
        table_name: "sp_purchased_products",
        ad_type: AdType::SponsoredProducts,
        report_type: ReportType::PurchasedProducts,
        report_type_id: "spPurchasedProduct",
        time_unit: TimeUnit::Summary,
        group_by: &["asin"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "advertisedAsin",
            "advertisedSku", "purchasedAsin", "keyword", "matchType", "purchasesOtherSku7d",
            "salesOtherSku7d", "unitsSoldOtherSku7d",
        ],
        data_retention_days: SP_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sb_campaign",
        table_name: "sb_campaign",
        ad_type: AdType::SponsoredBrands,
        report_type: ReportType::Campaign,
        report_type_id: "sbCampaigns",
        time_unit: TimeUnit::Daily,
        group_by: &["campaign"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "campaignStatus", "campaignBudgetAmount",
            "campaignBudgetType", "impressions", "clicks", "cost", "purchases", "sales",
            "unitsSold",
        ],
        data_retention_days: SB_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sb_ad_group",
        table_name: "sb_ad_group",
        ad_type: AdType::SponsoredBrands,
        report_type: ReportType::AdGroup,
        report_type_id: "sbAdGroup",
        time_unit: TimeUnit::Daily,
        group_by: &["adGroup"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "impressions", "clicks",
            "cost", "purchases", "sales",
        ],
        data_retention_days: SB_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sb_ad",
        table_name: "sb_ad",
        ad_type: AdType::SponsoredBrands,
        report_type: ReportType::Ad,
        report_type_id: "sbAds",
        time_unit: TimeUnit::Daily,
        group_by: &["ads"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "adId", "impressions",
            "clicks", "cost", "purchases", "sales",
        ],
        data_retention_days: SB_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sb_targeting",
        table_name: "sb_targeting",
        ad_type: AdType::SponsoredBrands,
        report_type: ReportType::Targeting,
        report_type_id: "sbTargeting",
        time_unit: TimeUnit::Daily,
        group_by: &["targeting"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "keywordId", "keywordText",
            "matchType", "targetingExpression", "targetingType", "impressions", "clicks",
            "cost", "purchases", "sales",
        ],
        data_retention_days: SB_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sb_search_term",
        table_name: "sb_search_term",
        ad_type: AdType::SponsoredBrands,
        report_type: ReportType::SearchTerm,
        report_type_id: "sbSearchTerm",
        time_unit: TimeUnit::Daily,
        group_by: &["searchTerm"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "keywordId", "keywordText",
            "matchType", "searchTerm", "impressions", "clicks", "cost", "purchases", "sales",
        ],
        data_retention_days: SB_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sb_purchased_products",
        table_name: "sb_purchased_products",
        ad_type: AdType::SponsoredBrands,
        report_type: ReportType::PurchasedProducts,
        report_type_id: "sbPurchasedProduct",
        time_unit: TimeUnit::Summary,
        group_by: &["purchasedAsin"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "purchasedAsin",
            "productName", "productCategory", "orders14d", "sales14d", "unitsSold14d",
        ],
        data_retention_days: SB_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sd_campaign",
        table_name: "sd_campaign",
        ad_type: AdType::SponsoredDisplay,
        report_type: ReportType::Campaign,
        report_type_id: "sdCampaigns",
        time_unit: TimeUnit::Daily,
        group_by: &["campaign"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "campaignStatus", "campaignBudgetAmount",
            "impressions", "clicks", "cost", "purchases", "sales", "unitsSold",
            "detailPageViews",
        ],
        data_retention_days: SD_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sd_ad_group",
        table_name: "sd_ad_group",
        ad_type: AdType::SponsoredDisplay,
        report_type: ReportType::AdGroup,
        report_type_id: "sdAdGroup",
        time_unit: TimeUnit::Daily,
        group_by: &["adGroup"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "impressions", "clicks",
            "cost", "purchases", "sales",
        ],
        data_retention_days: SD_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sd_targeting",
        table_name: "sd_targeting",
        ad_type: AdType::SponsoredDisplay,
        report_type: ReportType::Targeting,
        report_type_id: "sdTargeting",
        time_unit: TimeUnit::Daily,
        group_by: &["targeting"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "targetingId",
            "targetingExpression", "targetingText", "impressions", "clicks", "cost",
            "purchases", "sales",
        ],
        data_retention_days: SD_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sd_advertised_products",
        table_name: "sd_advertised_products",
        ad_type: AdType::SponsoredDisplay,
        report_type: ReportType::AdvertisedProducts,
        report_type_id: "sdAdvertisedProduct",
        time_unit: TimeUnit::Daily,
        group_by: &["advertiser"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "adId", "promotedAsin",
            "promotedSku", "impressions", "clicks", "cost", "purchases", "sales",
        ],
        data_retention_days: SD_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
    ReportDefinition {
        key: "sd_purchased_products",
        table_name: "sd_purchased_products",
        ad_type: AdType::SponsoredDisplay,
        report_type: ReportType::PurchasedProducts,
        report_type_id: "sdPurchasedProduct",
        time_unit: TimeUnit::Summary,
        group_by: &["asin"],
        filters: &[],
        metrics: &[
            "campaignId", "campaignName", "adGroupId", "adGroupName", "promotedAsin",
            "promotedSku", "asinBrandHalo", "conversionsBrandHalo", "salesBrandHalo",
            "unitsSoldBrandHalo",
        ],
        data_retention_days: SD_RETENTION,
        max_date_range_days: MAX_RANGE,
    },
];

pub fn registry_key(ad_type: AdType, report_type: ReportType) -> String {
    format!("{}_{}", ad_type.prefix(), report_type.as_str())
}

/// Registry entry for the pair, or `UnknownReportType`.
pub fn lookup(
    ad_type: AdType,
    report_type: ReportType,
) -> Result<&'static ReportDefinition, ReportError> {
    let key = registry_key(ad_type, report_type);
    REGISTRY
        .iter()
        .find(|def| def.key == key)
        .ok_or(ReportError::UnknownReportType {
            key,
            ad_type: ad_type.as_str(),
            report_type: report_type.as_str(),
        })
}

/// Human readable names of every registry entry, e.g. `SP Campaign`.
pub fn available_reports() -> Vec<String> {
    REGISTRY
        .iter()
        .map(|def| {
            let readable = def
                .key
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<String>>()
                .join(" ");
            // Ad product prefix is an acronym
            match readable.get(..2) {
                Some(prefix) => format!("{}{}", prefix.to_uppercase(), &readable[2..]),
                None => readable,
            }
        })
        .collect()
}

impl ReportDefinition {
    /// Metric columns plus the date columns implied by the time unit.
    pub fn columns(&self) -> Vec<&'static str> {
        self.metrics
            .iter()
            .chain(self.time_unit.date_columns())
            .copied()
            .collect()
    }

    /// Body of the Reporting v3 create call.
    pub fn request_body(&self, start_date: NaiveDate, end_date: NaiveDate) -> Value {
        let mut configuration = json!({
            "adProduct": self.ad_type.as_str(),
            "columns": self.columns(),
            "reportTypeId": self.report_type_id,
            "format": "GZIP_JSON",
            "groupBy": self.group_by,
            "timeUnit": self.time_unit.as_str(),
        });
        if !self.filters.is_empty() {
            let filters: Vec<Value> = self
                .filters
                .iter()
                .map(|f| json!({ "field": f.field, "values": f.values }))
                .collect();
            configuration["filters"] = Value::Array(filters);
        }

        json!({
            "name": format!("{}-{}", self.table_name, uuid::Uuid::new_v4()),
            "startDate": start_date.format("%Y-%m-%d").to_string(),
            "endDate": end_date.format("%Y-%m-%d").to_string(),
            "configuration": configuration,
        })
    }
}
