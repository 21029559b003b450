//! Clause accumulation and text rendering.
//!
//! [`FilterBuilder`] keeps every predicate as a [`Clause`] and only turns
//! them into query text in [`FilterBuilder::fragment`] and
//! [`FilterBuilder::finish`], so callers and tests can inspect the clause
//! list independently of the datasource's operator spelling.

use data_explorer_filter_models::{Clause, Literal, SyntaxTokens};

/// Placeholder replaced by the nested filter in aggregation templates.
pub const FILTER_PLACEHOLDER: &str = "<filterString>";

/// Accumulates filter clauses for one datasource syntax.
#[derive(Debug, Clone)]
pub struct FilterBuilder<'a> {
    syntax: &'a SyntaxTokens,
    clauses: Vec<Clause>,
}

impl<'a> FilterBuilder<'a> {
    /// Creates an empty builder rendering with `syntax`.
    #[must_use]
    pub const fn new(syntax: &'a SyntaxTokens) -> Self {
        Self {
            syntax,
            clauses: Vec::new(),
        }
    }

    /// The clauses collected so far, in the order they will be rendered.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns `true` if no clause has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Appends a clause unconditionally.
    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Appends caller-supplied text verbatim. Empty text is ignored.
    pub fn raw(&mut self, text: &str) {
        if !text.is_empty() {
            self.push(Clause::Raw {
                text: text.to_string(),
            });
        }
    }

    /// Appends an already substituted datasource template.
    pub fn template(&mut self, text: String) {
        if !text.is_empty() {
            self.push(Clause::Template { text });
        }
    }

    /// Appends `field IN (values)` when both the field and at least one
    /// value are present.
    pub fn member(&mut self, field: Option<&str>, values: Vec<Literal>) {
        if let Some(clause) = member_clause(field, values) {
            self.push(clause);
        }
    }

    /// Appends `field EQ value` when both the field and the value are
    /// present.
    pub fn equals(&mut self, field: Option<&str>, value: Option<Literal>) {
        if let (Some(field), Some(value)) = (field, value) {
            self.push(Clause::Eq {
                field: field.to_string(),
                value,
            });
        }
    }

    /// Appends a disjunction of `alternatives`. A single alternative is
    /// appended on its own and an empty list is ignored.
    pub fn any_of(&mut self, mut alternatives: Vec<Clause>) {
        match alternatives.len() {
            0 => {}
            1 => self.push(alternatives.remove(0)),
            _ => self.push(Clause::AnyOf {
                clauses: alternatives,
            }),
        }
    }

    /// Renders the clauses joined by the configured AND operator.
    ///
    /// Returns an empty string when there are no clauses.
    #[must_use]
    pub fn fragment(&self) -> String {
        let mut out = String::new();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(&self.syntax.and_operator);
                out.push(' ');
            }
            self.render_clause(clause, &mut out);
        }
        out
    }

    /// Renders the final filter.
    ///
    /// Without a template the result is the top-level query parameter form
    /// (`$filter=<fragment>&`), or `""` when no clause applies. With a
    /// template, [`FILTER_PLACEHOLDER`] is replaced by the nested
    /// `filter(<fragment>)/` step, or by `""` when no clause applies.
    #[must_use]
    pub fn finish(&self, aggregation_template: Option<&str>) -> String {
        let fragment = self.fragment();
        match aggregation_template {
            Some(template) => {
                let nested = if fragment.is_empty() {
                    String::new()
                } else {
                    format!("filter({fragment})/")
                };
                template.replace(FILTER_PLACEHOLDER, &nested)
            }
            None if fragment.is_empty() => String::new(),
            None => format!(
                "{}{}{fragment}&",
                self.syntax.filter_operator, self.syntax.param_assign_operator
            ),
        }
    }

    fn render_clause(&self, clause: &Clause, out: &mut String) {
        match clause {
            Clause::In { field, values } => {
                out.push_str(field);
                out.push_str(&self.syntax.in_operator);
                out.push('(');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(&self.syntax.multi_param_separator);
                    }
                    out.push_str(&value.to_string());
                }
                out.push(')');
            }
            Clause::Eq { field, value } => {
                out.push_str(field);
                out.push_str(&self.syntax.eq_operator);
                out.push_str(&value.to_string());
            }
            Clause::AnyOf { clauses } => {
                out.push('(');
                for (i, alternative) in clauses.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                        out.push_str(&self.syntax.or_operator);
                        out.push(' ');
                    }
                    self.render_clause(alternative, out);
                }
                out.push(')');
            }
            Clause::Template { text } | Clause::Raw { text } => out.push_str(text),
        }
    }
}

/// Builds `field IN (values)`, or `None` if the field is unconfigured or
/// there are no values.
#[must_use]
pub fn member_clause(field: Option<&str>, values: Vec<Literal>) -> Option<Clause> {
    let field = field?;
    if values.is_empty() {
        return None;
    }
    Some(Clause::In {
        field: field.to_string(),
        values,
    })
}
