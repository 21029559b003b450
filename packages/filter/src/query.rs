//! Request parameters to OData filter.
//!
//! Two entry points exist because datasets disagree on what a "period" is:
//! [`build_filter`] splits `"start - end"` tokens across separate start and
//! end fields, [`build_eligibility_filter`] matches each token as a whole
//! against a single period field. Every other dimension is handled
//! identically and in a fixed order, since later clauses are AND-joined
//! onto earlier ones.

use chrono::NaiveDate;
use data_explorer_filter_models::{
    Clause, FieldPaths, FilterConfig, Literal, ParamKey, QueryParams,
};

use crate::builder::{FilterBuilder, member_clause};

/// Placeholder for the start of the signed-year range.
const DATE_FROM_PLACEHOLDER: &str = "<date1>";
/// Placeholder for the (exclusive) end of the signed-year range.
const DATE_TO_PLACEHOLDER: &str = "<date2>";
/// Placeholder for the free-text search value.
const SEARCH_PLACEHOLDER: &str = "<value>";

type PeriodClauses = fn(&mut FilterBuilder<'_>, &FieldPaths, &[&str]);

/// Builds the filter for datasets whose periods are stored as separate
/// start and end fields (allocations, budgets, disbursements, ...).
///
/// With `aggregation_template` the nested `filter(...)/` form is substituted
/// into its `<filterString>` placeholder; otherwise the top-level
/// `$filter=...&` form is returned. `extra_filter` is placed before every
/// generated clause.
#[must_use]
pub fn build_filter(
    params: &QueryParams,
    config: &FilterConfig,
    aggregation_template: Option<&str>,
    extra_filter: Option<&str>,
) -> String {
    let filter = clauses(params, config, extra_filter).finish(aggregation_template);
    log::trace!("build_filter: {filter}");
    filter
}

/// Builds the filter for eligibility datasets, where each period token is
/// matched as a whole against a single period field.
///
/// Otherwise identical to [`build_filter`].
#[must_use]
pub fn build_eligibility_filter(
    params: &QueryParams,
    config: &FilterConfig,
    aggregation_template: Option<&str>,
    extra_filter: Option<&str>,
) -> String {
    let filter = eligibility_clauses(params, config, extra_filter).finish(aggregation_template);
    log::trace!("build_eligibility_filter: {filter}");
    filter
}

/// Collects the clauses [`build_filter`] would render.
#[must_use]
pub fn clauses<'a>(
    params: &QueryParams,
    config: &'a FilterConfig,
    extra_filter: Option<&str>,
) -> FilterBuilder<'a> {
    collect(params, config, extra_filter, start_end_periods)
}

/// Collects the clauses [`build_eligibility_filter`] would render.
#[must_use]
pub fn eligibility_clauses<'a>(
    params: &QueryParams,
    config: &'a FilterConfig,
    extra_filter: Option<&str>,
) -> FilterBuilder<'a> {
    collect(params, config, extra_filter, whole_periods)
}

fn collect<'a>(
    params: &QueryParams,
    config: &'a FilterConfig,
    extra_filter: Option<&str>,
    periods: PeriodClauses,
) -> FilterBuilder<'a> {
    let fields = &config.fields;
    let mut builder = FilterBuilder::new(&config.syntax);

    if let Some(extra) = extra_filter {
        builder.raw(extra);
    }

    let locations = quoted(&params.list(ParamKey::Locations));
    builder.any_of(
        [fields.country.as_deref(), fields.multicountry.as_deref()]
            .into_iter()
            .filter_map(|field| member_clause(field, locations.clone()))
            .collect(),
    );

    builder.member(
        fields.component.as_deref(),
        quoted(&params.list(ParamKey::Components)),
    );

    periods(&mut builder, fields, &params.list(ParamKey::Periods));

    builder.member(
        fields.status.as_deref(),
        quoted(&params.list(ParamKey::Status)),
    );
    builder.member(
        fields.partner.as_deref(),
        quoted(&params.list(ParamKey::Partners)),
    );
    builder.member(
        fields.partner_type.as_deref(),
        quoted(&params.list(ParamKey::PartnerTypes)),
    );
    builder.member(
        fields.partner_sub_type.as_deref(),
        quoted(&params.list(ParamKey::PartnerSubTypes)),
    );

    for (field, key) in [
        (&fields.grant_id, ParamKey::GrantId),
        (&fields.ip_number, ParamKey::IpNumber),
        (&fields.bar_period, ParamKey::BarPeriod),
        (&fields.committed_bar_period, ParamKey::CommittedBarPeriod),
    ] {
        builder.equals(field.as_deref(), params.scalar(key).map(Literal::bare));
    }

    if let (Some(template), Some(year)) = (
        fields.signed_bar_period.as_deref(),
        params.scalar(ParamKey::SignedBarPeriod),
    ) && let Some(text) = signed_year_range(template, year)
    {
        builder.template(text);
    }

    if let (Some(template), Some(q)) = (fields.search.as_deref(), params.scalar(ParamKey::Q)) {
        builder.template(template.replace(SEARCH_PLACEHOLDER, &Literal::quoted(q).to_string()));
    }

    if let Some(level) = params.scalar(ParamKey::LevelParam) {
        builder.push(Clause::Raw {
            text: level.to_string(),
        });
    }

    builder
}

fn quoted(values: &[&str]) -> Vec<Literal> {
    values.iter().map(|v| Literal::quoted(*v)).collect()
}

/// `"2017 - 2019"` contributes `2017` to the start field and `2019` to the
/// end field. A token without an end only contributes its start.
fn start_end_periods(builder: &mut FilterBuilder<'_>, fields: &FieldPaths, periods: &[&str]) {
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    for period in periods {
        let mut parts = period.split('-').map(str::trim);
        if let Some(start) = parts.next().filter(|s| !s.is_empty()) {
            starts.push(Literal::bare(start));
        }
        if let Some(end) = parts.next().filter(|s| !s.is_empty()) {
            ends.push(Literal::bare(end));
        }
    }

    builder.member(fields.period_start.as_deref(), starts);
    builder.member(fields.period_end.as_deref(), ends);
}

fn whole_periods(builder: &mut FilterBuilder<'_>, fields: &FieldPaths, periods: &[&str]) {
    builder.member(
        fields.period.as_deref(),
        periods.iter().map(|p| Literal::bare(*p)).collect(),
    );
}

/// Substitutes the half-open range `[year-01-01, year+1-01-01)` into
/// `template`. Returns `None` if `year` is not a valid calendar year.
fn signed_year_range(template: &str, year: &str) -> Option<String> {
    let year: i32 = year.trim().parse().ok()?;
    let from = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let to = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?;

    Some(
        template
            .replace(DATE_FROM_PLACEHOLDER, &from.format("%Y-%m-%d").to_string())
            .replace(DATE_TO_PLACEHOLDER, &to.format("%Y-%m-%d").to_string()),
    )
}
