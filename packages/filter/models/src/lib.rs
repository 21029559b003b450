#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query parameter, datasource configuration and filter clause types.
//!
//! These types are shared between the filter builder, the datasource
//! registry and the callers that turn incoming HTTP query strings into
//! outbound OData requests. They carry no behavior beyond simple lookups so
//! that the configuration can evolve independently of the builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

// ── Query parameters ─────────────────────────────────────────────────────

/// Query parameter keys understood by the filter builder.
///
/// The string forms match the keys the dashboard frontend sends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum ParamKey {
    /// Comma-separated country or multi-country codes.
    Locations,
    /// Comma-separated component names.
    Components,
    /// Comma-separated periods (`"2017 - 2019"` or `"2020"`).
    Periods,
    /// Comma-separated grant statuses.
    Status,
    /// Comma-separated partner names.
    Partners,
    /// Comma-separated partner types.
    PartnerTypes,
    /// Comma-separated partner sub-types.
    PartnerSubTypes,
    /// Grant identifier.
    GrantId,
    /// Implementation period number.
    #[strum(serialize = "IPnumber")]
    IpNumber,
    /// Budget/disbursement bar period.
    BarPeriod,
    /// Calendar year a grant was signed in.
    SignedBarPeriod,
    /// Calendar year of a commitment.
    CommittedBarPeriod,
    /// Free-text search.
    Q,
    /// Pre-formatted drilldown clause.
    LevelParam,
}

/// Incoming HTTP query parameters as an unordered string map.
///
/// Unknown keys are kept but ignored by the filter builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    /// Creates an empty parameter map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`Self::insert`] for a recognized key.
    #[must_use]
    pub fn with(mut self, key: ParamKey, value: impl Into<String>) -> Self {
        self.insert(key.as_ref(), value);
        self
    }

    /// Returns the raw value of a parameter, if present.
    #[must_use]
    pub fn get(&self, key: ParamKey) -> Option<&str> {
        self.0.get(key.as_ref()).map(String::as_str)
    }

    /// Returns the value of a single-valued parameter, treating an empty
    /// string the same as an absent one.
    #[must_use]
    pub fn scalar(&self, key: ParamKey) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Splits a multi-valued parameter on `,` and drops empty segments.
    ///
    /// Segments are not trimmed or deduplicated.
    #[must_use]
    pub fn list(&self, key: ParamKey) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split(',').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Iterates over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ── Datasource configuration ─────────────────────────────────────────────

/// Field paths for each logical filter dimension of one dataset.
///
/// A dimension whose path is `None` is never filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldPaths {
    /// Single-country code field.
    pub country: Option<String>,
    /// Multi-country grouping code field.
    pub multicountry: Option<String>,
    /// Component field.
    pub component: Option<String>,
    /// Period start field (start/end period datasets).
    pub period_start: Option<String>,
    /// Period end field (start/end period datasets).
    pub period_end: Option<String>,
    /// Whole-period field (eligibility datasets).
    pub period: Option<String>,
    /// Status field.
    pub status: Option<String>,
    /// Partner field.
    pub partner: Option<String>,
    /// Partner type field.
    pub partner_type: Option<String>,
    /// Partner sub-type field.
    pub partner_sub_type: Option<String>,
    /// Grant identifier field.
    pub grant_id: Option<String>,
    /// Implementation period number field.
    pub ip_number: Option<String>,
    /// Bar period field.
    pub bar_period: Option<String>,
    /// Commitment year field.
    pub committed_bar_period: Option<String>,
    /// Signed-date range template containing `<date1>` and `<date2>`.
    pub signed_bar_period: Option<String>,
    /// Free-text search template containing `<value>`.
    pub search: Option<String>,
}

impl FieldPaths {
    /// Returns `true` if no dimension has a field path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Syntax tokens of a datasource's query language.
///
/// The operator tokens are inserted verbatim, so `in_operator` and
/// `eq_operator` carry their own surrounding whitespace while
/// `and_operator` and `or_operator` are padded with single spaces when
/// joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyntaxTokens {
    /// Query parameter name for the filter (e.g. `"$filter"`).
    pub filter_operator: String,
    /// Assignment between parameter name and value (e.g. `"="`).
    pub param_assign_operator: String,
    /// Membership operator (e.g. `" in "`).
    #[serde(rename = "in")]
    pub in_operator: String,
    /// Equality operator (e.g. `" eq "`).
    #[serde(rename = "eq")]
    pub eq_operator: String,
    /// Conjunction (e.g. `"and"` or `"AND"`).
    pub and_operator: String,
    /// Disjunction (e.g. `"or"` or `"OR"`).
    pub or_operator: String,
    /// Separator between values of a membership list.
    pub multi_param_separator: String,
}

impl SyntaxTokens {
    /// Lower-case OData syntax: `$filter=`, ` in `, ` eq `, `and`, `or`, `,`.
    #[must_use]
    pub fn odata() -> Self {
        Self {
            filter_operator: "$filter".to_string(),
            param_assign_operator: "=".to_string(),
            in_operator: " in ".to_string(),
            eq_operator: " eq ".to_string(),
            and_operator: "and".to_string(),
            or_operator: "or".to_string(),
            multi_param_separator: ",".to_string(),
        }
    }
}

/// Partial [`SyntaxTokens`] used by datasets that deviate from their
/// datasource (most often in operator casing).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntaxOverride {
    /// Replacement for [`SyntaxTokens::filter_operator`].
    pub filter_operator: Option<String>,
    /// Replacement for [`SyntaxTokens::param_assign_operator`].
    pub param_assign_operator: Option<String>,
    /// Replacement for [`SyntaxTokens::in_operator`].
    #[serde(rename = "in")]
    pub in_operator: Option<String>,
    /// Replacement for [`SyntaxTokens::eq_operator`].
    #[serde(rename = "eq")]
    pub eq_operator: Option<String>,
    /// Replacement for [`SyntaxTokens::and_operator`].
    pub and_operator: Option<String>,
    /// Replacement for [`SyntaxTokens::or_operator`].
    pub or_operator: Option<String>,
    /// Replacement for [`SyntaxTokens::multi_param_separator`].
    pub multi_param_separator: Option<String>,
}

impl SyntaxOverride {
    /// Returns `base` with every token set in this override replaced.
    #[must_use]
    pub fn apply(&self, base: &SyntaxTokens) -> SyntaxTokens {
        let pick = |over: &Option<String>, base: &String| over.as_ref().unwrap_or(base).clone();
        SyntaxTokens {
            filter_operator: pick(&self.filter_operator, &base.filter_operator),
            param_assign_operator: pick(&self.param_assign_operator, &base.param_assign_operator),
            in_operator: pick(&self.in_operator, &base.in_operator),
            eq_operator: pick(&self.eq_operator, &base.eq_operator),
            and_operator: pick(&self.and_operator, &base.and_operator),
            or_operator: pick(&self.or_operator, &base.or_operator),
            multi_param_separator: pick(&self.multi_param_separator, &base.multi_param_separator),
        }
    }
}

/// Fully resolved filter configuration for one datasource dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Field paths per dimension.
    pub fields: FieldPaths,
    /// Query language tokens.
    pub syntax: SyntaxTokens,
}

// ── Clauses ──────────────────────────────────────────────────────────────

/// A value inside a filter clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// String literal, rendered inside single quotes with embedded quotes
    /// doubled.
    Quoted(String),
    /// Numeric or opaque identifier, rendered as-is.
    Bare(String),
}

impl Literal {
    /// Creates a quoted literal.
    #[must_use]
    pub fn quoted(value: impl Into<String>) -> Self {
        Self::Quoted(value.into())
    }

    /// Creates a bare literal.
    #[must_use]
    pub fn bare(value: impl Into<String>) -> Self {
        Self::Bare(value.into())
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quoted(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Self::Bare(v) => f.write_str(v),
        }
    }
}

/// One predicate of a filter, kept as data until rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clause {
    /// `field IN (v1,v2,...)`.
    In {
        /// Field path.
        field: String,
        /// Member values, in request order.
        values: Vec<Literal>,
    },
    /// `field EQ value`.
    Eq {
        /// Field path.
        field: String,
        /// Compared value.
        value: Literal,
    },
    /// Parenthesized disjunction of clauses.
    AnyOf {
        /// Alternatives.
        clauses: Vec<Self>,
    },
    /// A datasource template with its placeholders already substituted.
    Template {
        /// Rendered template text.
        text: String,
    },
    /// Caller-supplied text appended without parsing.
    Raw {
        /// Verbatim clause text.
        text: String,
    },
}
