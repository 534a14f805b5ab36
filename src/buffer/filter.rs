//! Taxonomy Filtering
//!
//! Rules narrow the cart by category, tag, and attribute selectors. Each
//! selector compiles to a query that renders one of three verdicts per item:
//! include, exclude, or no opinion. The first opinionated query in the
//! category, tag, attribute cascade decides the item.

use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::tags::TagSet;

/// Which price-tier partition a selection draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTierFilter {
    /// Price-tier lines only.
    Only,

    /// Everything except price-tier lines.
    Exclude,

    /// Whatever the buffer currently exposes.
    #[default]
    Include,
}

/// How a selector's values must relate to the item's own set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every listed value must be present.
    And,

    /// At least one listed value must be present.
    Or,

    /// No listed value may be present.
    Not,
}

/// A category or tag selector as rule configuration states it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaxonomySelector {
    /// Combinator over `values`.
    pub condition: MatchMode,

    /// The values to look for.
    pub values: Vec<String>,
}

impl TaxonomySelector {
    /// Builds a selector.
    pub fn new(condition: MatchMode, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            condition,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// An attribute selector; scoped to a single attribute code.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AttributeSelector {
    /// Combinator over `values`.
    pub condition: MatchMode,

    /// Which attribute of the item to inspect.
    pub attribute_code: String,

    /// The values to look for.
    pub values: Vec<String>,
}

impl AttributeSelector {
    /// Builds a selector.
    pub fn new(
        condition: MatchMode,
        attribute_code: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            condition,
            attribute_code: attribute_code.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A query's opinion on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Include,
    Exclude,
}

/// A compiled category/tag selector.
///
/// `not` compiles to an `or` match with the verdict inverted, so an item
/// carrying none of the listed values is included rather than passed over.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyQuery {
    all_required: bool,
    exclusion: bool,
    values: TagSet,
}

impl TaxonomyQuery {
    /// Compiles a selector.
    #[must_use]
    pub fn new(selector: &TaxonomySelector) -> Self {
        let (all_required, exclusion) = match selector.condition {
            MatchMode::And => (true, false),
            MatchMode::Or => (false, false),
            MatchMode::Not => (false, true),
        };

        Self {
            all_required,
            exclusion,
            values: TagSet::new(selector.values.iter().cloned().collect()),
        }
    }

    /// A query with no values can never render a verdict and is skipped.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.values.is_empty()
    }

    fn verdict(&self, pool: &TagSet) -> Option<Verdict> {
        let matched_count = pool.intersection_count(&self.values);
        let matched = if self.all_required {
            matched_count == self.values.len()
        } else {
            matched_count > 0
        };

        match (matched, self.exclusion) {
            (true, true) => Some(Verdict::Exclude),
            (true, false) | (false, true) => Some(Verdict::Include),
            (false, false) => None,
        }
    }
}

/// A compiled attribute selector.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeQuery {
    attribute_code: String,
    query: TaxonomyQuery,
}

impl AttributeQuery {
    /// Compiles a selector.
    #[must_use]
    pub fn new(selector: &AttributeSelector) -> Self {
        Self {
            attribute_code: selector.attribute_code.clone(),
            query: TaxonomyQuery::new(&TaxonomySelector {
                condition: selector.condition,
                values: selector.values.clone(),
            }),
        }
    }

    /// A query with no values can never render a verdict and is skipped.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.query.is_valid()
    }

    fn verdict(&self, item: &CartItem) -> Option<Verdict> {
        let empty = TagSet::empty();
        let pool = item.attributes.get(&self.attribute_code).unwrap_or(&empty);
        self.query.verdict(pool)
    }
}

/// The taxonomy constraints a rule carries, at most one query per axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyConditions {
    /// Category query, if the rule states one.
    pub categories: Option<TaxonomyQuery>,

    /// Tag query, if the rule states one.
    pub tags: Option<TaxonomyQuery>,

    /// Attribute query, if the rule states one.
    pub attributes: Option<AttributeQuery>,
}

impl TaxonomyConditions {
    /// Whether any axis carries a usable query.
    #[must_use]
    pub fn has_valid_query(&self) -> bool {
        self.categories.as_ref().is_some_and(TaxonomyQuery::is_valid)
            || self.tags.as_ref().is_some_and(TaxonomyQuery::is_valid)
            || self.attributes.as_ref().is_some_and(AttributeQuery::is_valid)
    }

    /// Cascades the three axes and returns the first opinionated verdict.
    ///
    /// `None` means no query had an opinion; callers treat that as exclusion
    /// when at least one valid query exists.
    #[must_use]
    pub(crate) fn verdict(&self, item: &CartItem) -> Option<bool> {
        let axes = [
            self.categories
                .as_ref()
                .filter(|query| query.is_valid())
                .and_then(|query| query.verdict(&item.categories)),
            self.tags
                .as_ref()
                .filter(|query| query.is_valid())
                .and_then(|query| query.verdict(&item.tags)),
            self.attributes
                .as_ref()
                .filter(|query| query.is_valid())
                .and_then(|query| query.verdict(item)),
        ];

        axes.into_iter()
            .flatten()
            .next()
            .map(|verdict| verdict == Verdict::Include)
    }
}
