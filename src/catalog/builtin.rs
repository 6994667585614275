//! Built-in stream definitions
//!
//! Each built-in stream is a variant of [`BuiltinStream`] backed by a static
//! [`StreamDescriptor`] naming the GAQL resource it reads, the fields it
//! selects and its key declarations.

use crate::schema::{schema_from_fields, JsonSchema, JsonType};

const STRING: JsonType = JsonType::String;
const NUMBER: JsonType = JsonType::Number;
const BOOLEAN: JsonType = JsonType::Boolean;

/// Date filter applied to report streams
pub const DATE_FILTER: &str =
    "segments.date >= '{{ start_date }}' AND segments.date <= '{{ end_date }}'";

/// Synthetic primary key field name
pub const SYNTHETIC_PRIMARY_KEY: &str = "_sdc_primary_key";

/// How a stream's records are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// POST `customers/{id}/googleAds:search` with a GAQL query
    Search,
    /// GET `customers:listAccessibleCustomers`
    ListAccessibleCustomers,
}

/// Static definition of a built-in stream
#[derive(Debug)]
pub struct StreamDescriptor {
    /// Unique stream name
    pub name: &'static str,
    /// GAQL resource in the FROM clause
    pub resource: &'static str,
    /// Selected fields and their JSON types
    pub fields: &'static [(&'static str, JsonType)],
    /// Whether the query is restricted to the configured date range
    pub date_filtered: bool,
    /// Additional WHERE condition
    pub filter: Option<&'static str>,
    /// Primary key field names
    pub primary_keys: &'static [&'static str],
    /// JSONPaths hashed into `_sdc_primary_key`
    pub primary_keys_jsonpaths: &'static [&'static str],
    /// Bookmark field (dot path)
    pub replication_key: Option<&'static str>,
    /// Fetch method
    pub endpoint: Endpoint,
}

/// Built-in stream kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinStream {
    Customer,
    Campaigns,
    AdGroups,
    AdGroupsPerformance,
    AccessibleCustomers,
    CustomerHierarchy,
    CampaignPerformance,
    CampaignPerformanceByAgeRangeAndDevice,
    CampaignPerformanceByGenderAndDevice,
    CampaignPerformanceByLocation,
    Geotargets,
    ConversionsByLocation,
}

impl BuiltinStream {
    /// Every built-in stream in catalog order
    pub const ALL: [BuiltinStream; 12] = [
        BuiltinStream::Customer,
        BuiltinStream::Campaigns,
        BuiltinStream::AdGroups,
        BuiltinStream::AdGroupsPerformance,
        BuiltinStream::AccessibleCustomers,
        BuiltinStream::CustomerHierarchy,
        BuiltinStream::CampaignPerformance,
        BuiltinStream::CampaignPerformanceByAgeRangeAndDevice,
        BuiltinStream::CampaignPerformanceByGenderAndDevice,
        BuiltinStream::CampaignPerformanceByLocation,
        BuiltinStream::Geotargets,
        BuiltinStream::ConversionsByLocation,
    ];

    /// Static descriptor for this stream
    pub fn descriptor(self) -> &'static StreamDescriptor {
        match self {
            BuiltinStream::Customer => &CUSTOMER,
            BuiltinStream::Campaigns => &CAMPAIGNS,
            BuiltinStream::AdGroups => &AD_GROUPS,
            BuiltinStream::AdGroupsPerformance => &AD_GROUPS_PERFORMANCE,
            BuiltinStream::AccessibleCustomers => &ACCESSIBLE_CUSTOMERS,
            BuiltinStream::CustomerHierarchy => &CUSTOMER_HIERARCHY,
            BuiltinStream::CampaignPerformance => &CAMPAIGN_PERFORMANCE,
            BuiltinStream::CampaignPerformanceByAgeRangeAndDevice => &CAMPAIGN_PERFORMANCE_BY_AGE,
            BuiltinStream::CampaignPerformanceByGenderAndDevice => &CAMPAIGN_PERFORMANCE_BY_GENDER,
            BuiltinStream::CampaignPerformanceByLocation => &CAMPAIGN_PERFORMANCE_BY_LOCATION,
            BuiltinStream::Geotargets => &GEOTARGETS,
            BuiltinStream::ConversionsByLocation => &CONVERSIONS_BY_LOCATION,
        }
    }

    /// Stream name
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Look up a built-in stream by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// GAQL query template, or None for streams not backed by a query
    pub fn query_template(self) -> Option<String> {
        let desc = self.descriptor();
        if desc.endpoint != Endpoint::Search {
            return None;
        }

        let fields: Vec<&str> = desc.fields.iter().map(|(f, _)| *f).collect();
        let mut query = format!("SELECT {} FROM {}", fields.join(", "), desc.resource);

        let conditions: Vec<&str> = desc
            .date_filtered
            .then_some(DATE_FILTER)
            .into_iter()
            .chain(desc.filter)
            .collect();
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }

        Some(query)
    }

    /// Record schema derived from the selected fields
    pub fn schema(self) -> JsonSchema {
        schema_from_fields(self.descriptor().fields)
    }
}

impl std::fmt::Display for BuiltinStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Descriptors
// ============================================================================

const SYNTHETIC_KEY: &[&str] = &[SYNTHETIC_PRIMARY_KEY];

static CUSTOMER: StreamDescriptor = StreamDescriptor {
    name: "customer",
    resource: "customer",
    fields: &[
        ("customer.id", STRING),
        ("customer.descriptive_name", STRING),
        ("customer.currency_code", STRING),
        ("customer.time_zone", STRING),
        ("customer.manager", BOOLEAN),
        ("customer.test_account", BOOLEAN),
        ("customer.auto_tagging_enabled", BOOLEAN),
    ],
    date_filtered: false,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &["$.customer.id"],
    replication_key: None,
    endpoint: Endpoint::Search,
};

static CAMPAIGNS: StreamDescriptor = StreamDescriptor {
    name: "campaigns",
    resource: "campaign",
    fields: &[
        ("campaign.id", STRING),
        ("campaign.name", STRING),
        ("campaign.status", STRING),
        ("campaign.serving_status", STRING),
        ("campaign.advertising_channel_type", STRING),
        ("campaign.bidding_strategy_type", STRING),
        ("campaign.start_date", STRING),
        ("campaign.end_date", STRING),
    ],
    date_filtered: false,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &["$.campaign.id"],
    replication_key: None,
    endpoint: Endpoint::Search,
};

static AD_GROUPS: StreamDescriptor = StreamDescriptor {
    name: "ad_groups",
    resource: "ad_group",
    fields: &[
        ("ad_group.id", STRING),
        ("ad_group.name", STRING),
        ("ad_group.status", STRING),
        ("ad_group.type", STRING),
        ("ad_group.campaign", STRING),
        ("ad_group.cpc_bid_micros", STRING),
    ],
    date_filtered: false,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &["$.adGroup.id"],
    replication_key: None,
    endpoint: Endpoint::Search,
};

static AD_GROUPS_PERFORMANCE: StreamDescriptor = StreamDescriptor {
    name: "ad_groups_performance",
    resource: "ad_group",
    fields: &[
        ("campaign.id", STRING),
        ("ad_group.id", STRING),
        ("ad_group.name", STRING),
        ("segments.date", STRING),
        ("metrics.impressions", STRING),
        ("metrics.clicks", STRING),
        ("metrics.cost_micros", STRING),
        ("metrics.conversions", NUMBER),
    ],
    date_filtered: true,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &["$.adGroup.id", "$.segments.date"],
    replication_key: Some("segments.date"),
    endpoint: Endpoint::Search,
};

static ACCESSIBLE_CUSTOMERS: StreamDescriptor = StreamDescriptor {
    name: "accessible_customers",
    resource: "",
    fields: &[("resource_name", STRING)],
    date_filtered: false,
    filter: None,
    primary_keys: &["resourceName"],
    primary_keys_jsonpaths: &[],
    replication_key: None,
    endpoint: Endpoint::ListAccessibleCustomers,
};

static CUSTOMER_HIERARCHY: StreamDescriptor = StreamDescriptor {
    name: "customer_hierarchy",
    resource: "customer_client",
    fields: &[
        ("customer_client.id", STRING),
        ("customer_client.client_customer", STRING),
        ("customer_client.descriptive_name", STRING),
        ("customer_client.level", STRING),
        ("customer_client.manager", BOOLEAN),
        ("customer_client.currency_code", STRING),
        ("customer_client.time_zone", STRING),
    ],
    date_filtered: false,
    filter: Some("customer_client.level <= 1"),
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &["$.customerClient.id"],
    replication_key: None,
    endpoint: Endpoint::Search,
};

static CAMPAIGN_PERFORMANCE: StreamDescriptor = StreamDescriptor {
    name: "campaign_performance",
    resource: "campaign",
    fields: &[
        ("campaign.id", STRING),
        ("campaign.name", STRING),
        ("campaign.status", STRING),
        ("segments.device", STRING),
        ("segments.date", STRING),
        ("metrics.impressions", STRING),
        ("metrics.clicks", STRING),
        ("metrics.ctr", NUMBER),
        ("metrics.average_cpc", NUMBER),
        ("metrics.cost_micros", STRING),
        ("metrics.conversions", NUMBER),
    ],
    date_filtered: true,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &["$.campaign.id", "$.segments.device", "$.segments.date"],
    replication_key: Some("segments.date"),
    endpoint: Endpoint::Search,
};

static CAMPAIGN_PERFORMANCE_BY_AGE: StreamDescriptor = StreamDescriptor {
    name: "campaign_performance_by_age_range_and_device",
    resource: "age_range_view",
    fields: &[
        ("ad_group_criterion.age_range.type", STRING),
        ("campaign.id", STRING),
        ("campaign.name", STRING),
        ("ad_group.id", STRING),
        ("segments.device", STRING),
        ("segments.date", STRING),
        ("metrics.impressions", STRING),
        ("metrics.clicks", STRING),
        ("metrics.cost_micros", STRING),
    ],
    date_filtered: true,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &[
        "$.campaign.id",
        "$.adGroup.id",
        "$.adGroupCriterion.ageRange.type",
        "$.segments.device",
        "$.segments.date",
    ],
    replication_key: Some("segments.date"),
    endpoint: Endpoint::Search,
};

static CAMPAIGN_PERFORMANCE_BY_GENDER: StreamDescriptor = StreamDescriptor {
    name: "campaign_performance_by_gender_and_device",
    resource: "gender_view",
    fields: &[
        ("ad_group_criterion.gender.type", STRING),
        ("campaign.id", STRING),
        ("campaign.name", STRING),
        ("ad_group.id", STRING),
        ("segments.device", STRING),
        ("segments.date", STRING),
        ("metrics.impressions", STRING),
        ("metrics.clicks", STRING),
        ("metrics.cost_micros", STRING),
    ],
    date_filtered: true,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &[
        "$.campaign.id",
        "$.adGroup.id",
        "$.adGroupCriterion.gender.type",
        "$.segments.device",
        "$.segments.date",
    ],
    replication_key: Some("segments.date"),
    endpoint: Endpoint::Search,
};

static CAMPAIGN_PERFORMANCE_BY_LOCATION: StreamDescriptor = StreamDescriptor {
    name: "campaign_performance_by_location",
    resource: "location_view",
    fields: &[
        ("campaign_criterion.location.geo_target_constant", STRING),
        ("campaign.id", STRING),
        ("campaign.name", STRING),
        ("segments.date", STRING),
        ("metrics.impressions", STRING),
        ("metrics.clicks", STRING),
        ("metrics.cost_micros", STRING),
    ],
    date_filtered: true,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &[
        "$.campaign.id",
        "$.campaignCriterion.location.geoTargetConstant",
        "$.segments.date",
    ],
    replication_key: Some("segments.date"),
    endpoint: Endpoint::Search,
};

static GEOTARGETS: StreamDescriptor = StreamDescriptor {
    name: "geotargets",
    resource: "geo_target_constant",
    fields: &[
        ("geo_target_constant.id", STRING),
        ("geo_target_constant.name", STRING),
        ("geo_target_constant.canonical_name", STRING),
        ("geo_target_constant.country_code", STRING),
        ("geo_target_constant.target_type", STRING),
        ("geo_target_constant.status", STRING),
        ("geo_target_constant.parent_geo_target", STRING),
    ],
    date_filtered: false,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &["$.geoTargetConstant.id"],
    replication_key: None,
    endpoint: Endpoint::Search,
};

static CONVERSIONS_BY_LOCATION: StreamDescriptor = StreamDescriptor {
    name: "conversions_by_location",
    resource: "user_location_view",
    fields: &[
        ("campaign.id", STRING),
        ("user_location_view.country_criterion_id", STRING),
        ("user_location_view.targeting_location", BOOLEAN),
        ("segments.date", STRING),
        ("segments.conversion_action_name", STRING),
        ("metrics.conversions", NUMBER),
        ("metrics.conversions_value", NUMBER),
        ("metrics.all_conversions", NUMBER),
    ],
    date_filtered: true,
    filter: None,
    primary_keys: SYNTHETIC_KEY,
    primary_keys_jsonpaths: &[
        "$.campaign.id",
        "$.userLocationView.countryCriterionId",
        "$.userLocationView.targetingLocation",
        "$.segments.conversionActionName",
        "$.segments.date",
    ],
    replication_key: Some("segments.date"),
    endpoint: Endpoint::Search,
};
