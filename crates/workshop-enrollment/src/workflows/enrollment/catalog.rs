use serde::{Deserialize, Serialize};

use super::domain::{AgeRange, Category, Offering, OfferingId, Slot};

/// Age brackets offered by the catalog filter.
pub const AGE_BANDS: [AgeRange; 3] = [
    AgeRange::new(3, 6),
    AgeRange::new(7, 11),
    AgeRange::new(12, 17),
];

/// How a filter dimension treats an offering that carries no data for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataPolicy {
    #[default]
    Include,
    Exclude,
}

impl MissingDataPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "include" | "pass" => Some(Self::Include),
            "exclude" | "fail" => Some(Self::Exclude),
            _ => None,
        }
    }
}

/// Result of evaluating one filter dimension against one offering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch,
    /// The offering lacks the data this dimension needs.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn verdict(&self, offering: &Offering) -> Verdict {
        match self {
            CategoryFilter::All => Verdict::Match,
            CategoryFilter::Only(category) if *category == offering.category => Verdict::Match,
            CategoryFilter::Only(_) => Verdict::Mismatch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AgeFilter {
    #[default]
    All,
    Band(AgeRange),
}

impl AgeFilter {
    /// Accepts `all` or one of the catalog bands written `min-max`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }

        let (min, max) = raw.split_once('-')?;
        let band = AgeRange::new(min.trim().parse().ok()?, max.trim().parse().ok()?);
        AGE_BANDS.contains(&band).then_some(Self::Band(band))
    }

    pub fn verdict(&self, offering: &Offering) -> Verdict {
        match (self, offering.audience) {
            (AgeFilter::All, _) => Verdict::Match,
            (AgeFilter::Band(_), None) => Verdict::Unknown,
            (AgeFilter::Band(band), Some(audience)) if band.overlaps(&audience) => Verdict::Match,
            (AgeFilter::Band(_), Some(_)) => Verdict::Mismatch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DepartmentFilter {
    #[default]
    All,
    Code(String),
}

impl DepartmentFilter {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Code(raw.to_string())
        }
    }

    pub fn verdict(&self, offering: &Offering) -> Verdict {
        match (self, offering.department.as_deref()) {
            (DepartmentFilter::All, _) => Verdict::Match,
            (DepartmentFilter::Code(_), None) => Verdict::Unknown,
            (DepartmentFilter::Code(code), Some(department)) if code == department => {
                Verdict::Match
            }
            (DepartmentFilter::Code(_), Some(_)) => Verdict::Mismatch,
        }
    }
}

/// Catalog browsing criteria, one tagged predicate per dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub category: CategoryFilter,
    pub age_range: AgeFilter,
    pub department: DepartmentFilter,
    pub on_missing: MissingDataPolicy,
}

impl FilterCriteria {
    pub fn admits(&self, offering: &Offering) -> bool {
        [
            self.category.verdict(offering),
            self.age_range.verdict(offering),
            self.department.verdict(offering),
        ]
        .into_iter()
        .all(|verdict| match verdict {
            Verdict::Match => true,
            Verdict::Mismatch => false,
            Verdict::Unknown => self.on_missing == MissingDataPolicy::Include,
        })
    }
}

/// Lazily yield the offerings admitted by `criteria`, in input order. The
/// returned iterator is `Clone`, so a caller can restart it at will.
pub fn filter<'a, I>(
    offerings: I,
    criteria: &'a FilterCriteria,
) -> impl Iterator<Item = &'a Offering> + Clone + 'a
where
    I: IntoIterator<Item = &'a Offering>,
    I::IntoIter: Clone + 'a,
{
    offerings
        .into_iter()
        .filter(move |offering| criteria.admits(offering))
}

pub fn is_selectable(slot: &Slot) -> bool {
    slot.remaining_capacity > 0
}

/// Share of the base price charged for a household index, in percent.
pub const fn price_percent(household_index: u32) -> u32 {
    match household_index {
        0..=499 => 30,
        500..=999 => 50,
        1000..=1499 => 70,
        _ => 100,
    }
}

/// Tiered price for a household index, rounded half-up to a whole unit.
pub fn price(offering: &Offering, household_index: u32) -> u32 {
    let scaled = u64::from(offering.base_price) * u64::from(price_percent(household_index));
    ((scaled + 50) / 100) as u32
}

/// Price breakdown shown next to an offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub offering_id: OfferingId,
    pub base_price: u32,
    pub household_index: u32,
    pub percent_charged: u32,
    pub amount: u32,
}

pub fn quote(offering: &Offering, household_index: u32) -> PriceQuote {
    PriceQuote {
        offering_id: offering.id.clone(),
        base_price: offering.base_price,
        household_index,
        percent_charged: price_percent(household_index),
        amount: price(offering, household_index),
    }
}

/// Read-only source of offering snapshots.
pub trait CatalogProvider: Send + Sync {
    fn offerings(&self) -> Result<Vec<Offering>, CatalogError>;
    fn offering(&self, id: &OfferingId) -> Result<Option<Offering>, CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("offering '{offering}' reports {remaining} remaining places out of {total}")]
    CapacityOverflow {
        offering: OfferingId,
        remaining: u32,
        total: u32,
    },
    #[error("offering '{0}' is listed more than once")]
    DuplicateOffering(OfferingId),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Check the capacity invariants of a single offering snapshot.
pub fn validate_offering(offering: &Offering) -> Result<(), CatalogError> {
    let overflow = |remaining| CatalogError::CapacityOverflow {
        offering: offering.id.clone(),
        remaining,
        total: offering.total_capacity,
    };

    if offering.remaining_capacity > offering.total_capacity {
        return Err(overflow(offering.remaining_capacity));
    }

    match offering
        .slots
        .iter()
        .find(|slot| slot.remaining_capacity > offering.total_capacity)
    {
        Some(slot) => Err(overflow(slot.remaining_capacity)),
        None => Ok(()),
    }
}

/// In-memory catalog holding validated snapshots.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    offerings: Vec<Offering>,
}

impl StaticCatalog {
    pub fn new(offerings: Vec<Offering>) -> Result<Self, CatalogError> {
        for (index, offering) in offerings.iter().enumerate() {
            validate_offering(offering)?;
            if offerings[..index].iter().any(|seen| seen.id == offering.id) {
                return Err(CatalogError::DuplicateOffering(offering.id.clone()));
            }
        }

        Ok(Self { offerings })
    }
}

impl CatalogProvider for StaticCatalog {
    fn offerings(&self) -> Result<Vec<Offering>, CatalogError> {
        Ok(self.offerings.clone())
    }

    fn offering(&self, id: &OfferingId) -> Result<Option<Offering>, CatalogError> {
        Ok(self
            .offerings
            .iter()
            .find(|offering| &offering.id == id)
            .cloned())
    }
}
