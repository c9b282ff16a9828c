use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog offerings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferingId(pub String);

/// Identifier wrapper for a concrete date/time slot of an offering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub String);

/// Identifier wrapper for a required piece of paperwork.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequirementId(pub String);

/// Identifier wrapper for an open enrollment session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

macro_rules! display_as_inner {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_as_inner!(OfferingId, SlotId, RequirementId, SessionId);

/// Program families offered to enrolled children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TherapeuticEducation,
    AdaptedPhysicalActivity,
}

impl Category {
    pub const fn ordered() -> [Self; 2] {
        [Self::TherapeuticEducation, Self::AdaptedPhysicalActivity]
    }

    /// Short code shown on cards and badges.
    pub const fn code(self) -> &'static str {
        match self {
            Self::TherapeuticEducation => "ETP",
            Self::AdaptedPhysicalActivity => "APA",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::TherapeuticEducation => "Therapeutic Education",
            Self::AdaptedPhysicalActivity => "Adapted Physical Activity",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "etp" | "therapeutic_education" => Some(Self::TherapeuticEducation),
            "apa" | "adapted_physical_activity" => Some(Self::AdaptedPhysicalActivity),
            _ => None,
        }
    }
}

/// Inclusive age bracket in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min_age: u8,
    pub max_age: u8,
}

impl AgeRange {
    pub const fn new(min_age: u8, max_age: u8) -> Self {
        Self { min_age, max_age }
    }

    pub fn overlaps(&self, other: &AgeRange) -> bool {
        self.min_age <= other.max_age && other.min_age <= self.max_age
    }

    pub fn contains(&self, age: u8) -> bool {
        (self.min_age..=self.max_age).contains(&age)
    }
}

/// A concrete date/time instance of an offering with its own capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub date: NaiveDate,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    pub remaining_capacity: u32,
}

impl Slot {
    pub fn time_window(&self) -> String {
        format!(
            "{} - {}",
            self.starts_at.format("%H:%M"),
            self.ends_at.format("%H:%M")
        )
    }
}

/// Read-only catalog entry for a schedulable group activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub id: OfferingId,
    pub title: String,
    pub category: Category,
    pub level: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub audience: Option<AgeRange>,
    pub total_capacity: u32,
    pub remaining_capacity: u32,
    pub base_price: u32,
    pub household_index: u32,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl Offering {
    pub fn slot(&self, slot_id: &SlotId) -> Option<&Slot> {
        self.slots.iter().find(|slot| &slot.id == slot_id)
    }

    pub fn is_full(&self) -> bool {
        self.remaining_capacity == 0
    }
}

/// Immutable description of a document the enrollment mandates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    pub id: RequirementId,
    pub name: String,
    pub required: bool,
    pub description: String,
    #[serde(default)]
    pub max_age_months: Option<u32>,
}

/// Lifecycle states of a document slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Missing,
    Uploaded,
    Validated,
    Expired,
    Invalid,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Uploaded => "uploaded",
            Self::Validated => "validated",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
        }
    }

    /// Whether the status lets the guardian leave the document step.
    pub const fn satisfies_requirement(self) -> bool {
        matches!(self, Self::Uploaded | Self::Validated)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque reference to stored file content owned by the intake provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHandle(pub String);

/// File metadata handed over by the intake provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub media_type: String,
    pub size: u64,
    pub handle: ContentHandle,
}

/// Reference to the child being enrolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub reference: String,
    pub first_name: String,
    pub age: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_codes_and_names() {
        assert_eq!(Category::parse("etp"), Some(Category::TherapeuticEducation));
        assert_eq!(
            Category::parse("adapted-physical-activity"),
            Some(Category::AdaptedPhysicalActivity)
        );
        assert_eq!(Category::parse("yoga"), None);
    }

    #[test]
    fn age_ranges_overlap_on_shared_years() {
        let band = AgeRange::new(7, 11);
        assert!(band.overlaps(&AgeRange::new(6, 9)));
        assert!(band.overlaps(&AgeRange::new(11, 14)));
        assert!(!band.overlaps(&AgeRange::new(12, 17)));
        assert!(band.contains(8));
    }

    #[test]
    fn only_uploaded_and_validated_satisfy_requirements() {
        assert!(DocumentStatus::Uploaded.satisfies_requirement());
        assert!(DocumentStatus::Validated.satisfies_requirement());
        assert!(!DocumentStatus::Missing.satisfies_requirement());
        assert!(!DocumentStatus::Expired.satisfies_requirement());
        assert!(!DocumentStatus::Invalid.satisfies_requirement());
    }
}
