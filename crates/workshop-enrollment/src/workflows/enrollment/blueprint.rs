use chrono::{NaiveDate, NaiveTime};

use super::catalog::{CatalogError, StaticCatalog};
use super::domain::{
    AgeRange, Category, DocumentRequirement, Offering, OfferingId, RequirementId, Slot, SlotId,
};

/// Immutable definition of one enrollment flow: the paperwork it mandates and
/// the offerings it can enroll into.
#[derive(Debug)]
pub struct EnrollmentBlueprint {
    requirements: Vec<DocumentRequirement>,
    offerings: Vec<Offering>,
}

impl EnrollmentBlueprint {
    pub fn standard() -> Self {
        Self {
            requirements: standard_requirements(),
            offerings: standard_offerings(),
        }
    }

    pub fn new(requirements: Vec<DocumentRequirement>, offerings: Vec<Offering>) -> Self {
        Self {
            requirements,
            offerings,
        }
    }

    pub fn requirements(&self) -> &[DocumentRequirement] {
        &self.requirements
    }

    pub fn offerings(&self) -> &[Offering] {
        &self.offerings
    }

    pub fn catalog(&self) -> Result<StaticCatalog, CatalogError> {
        StaticCatalog::new(self.offerings.clone())
    }
}

fn requirement(
    id: &str,
    name: &str,
    description: &str,
    max_age_months: Option<u32>,
) -> DocumentRequirement {
    DocumentRequirement {
        id: RequirementId(id.to_string()),
        name: name.to_string(),
        required: true,
        description: description.to_string(),
        max_age_months,
    }
}

fn standard_requirements() -> Vec<DocumentRequirement> {
    vec![
        requirement(
            "consent",
            "Family consent",
            "Consent to take part in the program's group activities.",
            None,
        ),
        requirement(
            "medical",
            "Medical certificate",
            "Certificate stating no contraindication to the activity.",
            Some(6),
        ),
        requirement(
            "parental",
            "Parental authorisation",
            "Authorisation from a legal guardian for the child's participation.",
            None,
        ),
        requirement(
            "insurance",
            "Extracurricular insurance",
            "Civil liability and personal accident insurance certificate.",
            None,
        ),
    ]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn slot(day: NaiveDate, start_hour: u32, end_hour: u32, remaining_capacity: u32) -> Slot {
    let starts_at = NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or_default();
    let ends_at = NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or_default();
    Slot {
        id: SlotId(format!("{}T{}", day.format("%Y-%m-%d"), starts_at.format("%H%M"))),
        date: day,
        starts_at,
        ends_at,
        remaining_capacity,
    }
}

fn standard_offerings() -> Vec<Offering> {
    vec![
        Offering {
            id: OfferingId("balanced-cooking".to_string()),
            title: "Balanced Cooking Workshop".to_string(),
            category: Category::TherapeuticEducation,
            level: "Beginner".to_string(),
            start_date: date(2024, 3, 15),
            end_date: date(2024, 4, 5),
            location: "Toulouse Centre".to_string(),
            department: Some("31".to_string()),
            audience: Some(AgeRange::new(7, 11)),
            total_capacity: 12,
            remaining_capacity: 9,
            base_price: 120,
            household_index: 800,
            slots: vec![
                slot(date(2024, 3, 15), 14, 16, 3),
                slot(date(2024, 3, 22), 14, 16, 1),
                slot(date(2024, 3, 29), 10, 12, 5),
                slot(date(2024, 4, 5), 14, 16, 0),
            ],
        },
        Offering {
            id: OfferingId("playful-movement".to_string()),
            title: "Playful Physical Activity".to_string(),
            category: Category::AdaptedPhysicalActivity,
            level: "All levels".to_string(),
            start_date: date(2024, 3, 20),
            end_date: date(2024, 3, 27),
            location: "Blagnac".to_string(),
            department: Some("31".to_string()),
            audience: Some(AgeRange::new(3, 6)),
            total_capacity: 8,
            remaining_capacity: 0,
            base_price: 80,
            household_index: 800,
            slots: vec![
                slot(date(2024, 3, 20), 10, 11, 0),
                slot(date(2024, 3, 27), 10, 11, 0),
            ],
        },
        Offering {
            id: OfferingId("nutrition-discovery".to_string()),
            title: "Nutrition Discovery".to_string(),
            category: Category::TherapeuticEducation,
            level: "Intermediate".to_string(),
            start_date: date(2024, 3, 25),
            end_date: date(2024, 4, 1),
            location: "Colomiers".to_string(),
            department: None,
            audience: None,
            total_capacity: 10,
            remaining_capacity: 7,
            base_price: 100,
            household_index: 800,
            slots: vec![
                slot(date(2024, 3, 25), 14, 16, 4),
                slot(date(2024, 4, 1), 14, 16, 3),
            ],
        },
        Offering {
            id: OfferingId("sport-wellbeing".to_string()),
            title: "Sport and Wellbeing".to_string(),
            category: Category::AdaptedPhysicalActivity,
            level: "Beginner".to_string(),
            start_date: date(2024, 4, 5),
            end_date: date(2024, 4, 12),
            location: "Muret".to_string(),
            department: Some("31".to_string()),
            audience: Some(AgeRange::new(12, 17)),
            total_capacity: 15,
            remaining_capacity: 5,
            base_price: 90,
            household_index: 800,
            slots: vec![
                slot(date(2024, 4, 5), 17, 18, 2),
                slot(date(2024, 4, 12), 17, 18, 3),
            ],
        },
    ]
}
