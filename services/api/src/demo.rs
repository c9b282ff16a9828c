use crate::infra::{describe_file, parse_attachment, standard_service, DeskService};
use clap::Args;
use std::path::PathBuf;
use workshop_enrollment::config::EnrollmentConfig;
use workshop_enrollment::error::AppError;
use workshop_enrollment::workflows::enrollment::{
    AgeFilter, CategoryFilter, ChildProfile, ContentHandle, DepartmentFilter, FileDescriptor,
    FilterCriteria, MissingDataPolicy, Offering, OfferingId, RequirementId, ReviewVerdict,
    SessionView, SlotId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogListArgs {
    /// Category code (ETP or APA). Defaults to every category.
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: Option<CategoryFilter>,
    /// Age band (3-6, 7-11 or 12-17). Defaults to every age.
    #[arg(long, value_parser = parse_age_band)]
    pub(crate) age_range: Option<AgeFilter>,
    /// Department code, for example 31.
    #[arg(long)]
    pub(crate) department: Option<String>,
    /// Whether offerings lacking the filtered data are kept (include | exclude).
    #[arg(long, value_parser = parse_policy)]
    pub(crate) on_missing: Option<MissingDataPolicy>,
}

#[derive(Args, Debug)]
pub(crate) struct PriceArgs {
    /// Offering identifier, for example balanced-cooking
    #[arg(long)]
    pub(crate) offering: String,
    /// Household index (quotient familial) used for the price tier
    #[arg(long)]
    pub(crate) household_index: u32,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Offering to enroll into
    #[arg(long, default_value = "balanced-cooking")]
    pub(crate) offering: String,
    /// Slot identifier (YYYY-MM-DDTHHMM). Defaults to the first slot with places left.
    #[arg(long)]
    pub(crate) slot: Option<String>,
    /// First name of the enrolled child
    #[arg(long, default_value = "Lea")]
    pub(crate) child_name: String,
    /// Age of the enrolled child
    #[arg(long, default_value_t = 9)]
    pub(crate) child_age: u8,
    /// Attach a local file as REQUIREMENT=PATH; other requirements get a sample PDF.
    #[arg(long = "attach", value_parser = parse_attachment)]
    pub(crate) attachments: Vec<(RequirementId, PathBuf)>,
    /// Have the reviewer validate every uploaded document before confirmation.
    #[arg(long)]
    pub(crate) review: bool,
    /// Leave the participation terms unaccepted to see the submission guard.
    #[arg(long)]
    pub(crate) decline_terms: bool,
}

fn parse_category(raw: &str) -> Result<CategoryFilter, String> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(CategoryFilter::All);
    }
    workshop_enrollment::workflows::enrollment::Category::parse(raw)
        .map(CategoryFilter::Only)
        .ok_or_else(|| format!("unknown category '{raw}' (expected ETP or APA)"))
}

fn parse_age_band(raw: &str) -> Result<AgeFilter, String> {
    AgeFilter::parse(raw).ok_or_else(|| format!("unknown age band '{raw}' (expected 3-6, 7-11 or 12-17)"))
}

fn parse_policy(raw: &str) -> Result<MissingDataPolicy, String> {
    MissingDataPolicy::parse(raw).ok_or_else(|| format!("expected include or exclude, got '{raw}'"))
}

pub(crate) fn run_catalog_listing(args: CatalogListArgs) -> Result<(), AppError> {
    let config = EnrollmentConfig::from_env()?;
    let (service, _) = standard_service(config.clone())?;

    let criteria = FilterCriteria {
        category: args.category.unwrap_or_default(),
        age_range: args.age_range.unwrap_or_default(),
        department: args
            .department
            .as_deref()
            .map(DepartmentFilter::parse)
            .unwrap_or_default(),
        on_missing: args.on_missing.unwrap_or(config.filter_missing_data),
    };

    let all = service.browse(&FilterCriteria::default())?;
    let offerings = service.browse(&criteria)?;
    println!(
        "Workshop catalog ({} of {} offerings)",
        offerings.len(),
        all.len()
    );
    for offering in &offerings {
        render_offering(offering);
    }
    Ok(())
}

pub(crate) fn run_price_quote(args: PriceArgs) -> Result<(), AppError> {
    let (service, _) = standard_service(EnrollmentConfig::from_env()?)?;
    let quote = service.quote(&OfferingId(args.offering), args.household_index)?;
    println!(
        "{}: base price {} | household index {} -> {}% charged = {}",
        quote.offering_id, quote.base_price, quote.household_index, quote.percent_charged, quote.amount
    );
    Ok(())
}

fn render_offering(offering: &Offering) {
    let audience = offering
        .audience
        .map(|range| format!("ages {}-{}", range.min_age, range.max_age))
        .unwrap_or_else(|| "all ages".to_string());
    let department = offering
        .department
        .as_deref()
        .map(|code| format!("dept {code}"))
        .unwrap_or_else(|| "dept n/a".to_string());
    let places = if offering.is_full() {
        "full".to_string()
    } else {
        format!(
            "{}/{} places",
            offering.remaining_capacity, offering.total_capacity
        )
    };

    println!(
        "- [{}] {} ({}) | {}, {} | {} | {} | base price {}",
        offering.category.code(),
        offering.title,
        offering.id,
        offering.location,
        department,
        audience,
        places,
        offering.base_price
    );
    for slot in &offering.slots {
        let left = if slot.remaining_capacity == 0 {
            "full".to_string()
        } else {
            format!("{} left", slot.remaining_capacity)
        };
        println!(
            "    {} {} {} ({})",
            slot.id,
            slot.date,
            slot.time_window(),
            left
        );
    }
}

fn render_progress(view: &SessionView) {
    let steps: Vec<String> = view
        .steps
        .iter()
        .map(|step| {
            let marker = if step.completed {
                "x"
            } else if step.current {
                ">"
            } else {
                " "
            };
            format!("[{marker}] {}", step.label)
        })
        .collect();
    println!("  Progress: {}", steps.join("  "));
}

fn sample_document(requirement: &RequirementId) -> FileDescriptor {
    FileDescriptor {
        name: format!("{requirement}.pdf"),
        media_type: "application/pdf".to_string(),
        size: 120 * 1024,
        handle: ContentHandle(format!("demo://{requirement}")),
    }
}

fn first_open_slot(service: &DeskService, offering_id: &OfferingId) -> Result<Option<SlotId>, AppError> {
    let offering = service
        .browse(&FilterCriteria::default())?
        .into_iter()
        .find(|offering| &offering.id == offering_id);
    Ok(offering.and_then(|offering| {
        offering
            .slots
            .into_iter()
            .find(|slot| slot.remaining_capacity > 0)
            .map(|slot| slot.id)
    }))
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        offering,
        slot,
        child_name,
        child_age,
        attachments,
        review,
        decline_terms,
    } = args;

    let (service, desk) = standard_service(EnrollmentConfig::from_env()?)?;
    let offering_id = OfferingId(offering);

    println!("Guided enrollment demo");
    let child = ChildProfile {
        reference: format!("demo-{}", child_name.to_ascii_lowercase()),
        first_name: child_name,
        age: child_age,
    };
    let view = match service.open(&offering_id, child) {
        Ok(view) => view,
        Err(err) => {
            println!("  Enrollment unavailable: {}", err);
            return Ok(());
        }
    };
    let session = view.session_id.clone();
    println!(
        "- Opened session {} for {} [{}], quoted price {}",
        session, view.offering_title, view.category, view.quoted_price
    );
    render_progress(&view);

    let slot_id = match slot {
        Some(raw) => SlotId(raw),
        None => match first_open_slot(&service, &offering_id)? {
            Some(slot_id) => slot_id,
            None => {
                println!("  No slot has places left");
                return Ok(());
            }
        },
    };
    if let Err(err) = service.select_slot(&session, &slot_id) {
        println!("  Slot {} refused: {}", slot_id, err);
        return Ok(());
    }
    let view = service.advance(&session)?;
    println!("- Selected slot {}", slot_id);
    render_progress(&view);

    println!("- Uploading documents");
    for requirement in service.requirements().to_vec() {
        let file = match attachments.iter().find(|(id, _)| id == &requirement.id) {
            Some((_, path)) => describe_file(path)?,
            None => sample_document(&requirement.id),
        };
        match service.attach_document(&session, &requirement.id, &file) {
            Ok(_) => println!(
                "    {}: {} ({} bytes, {})",
                requirement.name, file.name, file.size, file.media_type
            ),
            Err(err) => println!("    {}: refused ({})", requirement.name, err),
        }
        if review {
            if let Err(err) =
                service.review_document(&session, &requirement.id, ReviewVerdict::Validated)
            {
                println!("    {}: review skipped ({})", requirement.name, err);
            }
        }
    }

    let view = match service.advance(&session) {
        Ok(view) => view,
        Err(err) => {
            println!("  Cannot reach confirmation: {}", err);
            let cancelled = service.cancel(&session)?;
            println!(
                "  Session {} cancelled, {} documents discarded",
                cancelled.session_id, cancelled.discarded_documents
            );
            return Ok(());
        }
    };
    render_progress(&view);
    println!(
        "  Dossier: {}% validated, {} uploaded, {} missing",
        view.dossier.completion_percentage, view.dossier.uploaded, view.dossier.missing
    );

    service.accept_terms(&session, !decline_terms)?;
    match service.submit(&session).await {
        Ok(receipt) => {
            println!(
                "- Submitted: registration {} is {}",
                receipt.registration_id,
                receipt.status.label()
            );
            if let Some(left) = desk.remaining(&slot_id) {
                println!("  Places left on {}: {}", slot_id, left);
            }
        }
        Err(err) => println!("- Submission not accepted: {}", err),
    }

    let tabs = desk.tab_counts();
    println!(
        "\nRegistrations: {} pending | {} validated | {} completed",
        tabs.pending, tabs.validated, tabs.completed
    );
    for record in desk.registrations(None) {
        match serde_json::to_string_pretty(&record) {
            Ok(json) => println!("{}", json),
            Err(err) => println!("  Registration payload unavailable: {}", err),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workshop_enrollment::workflows::enrollment::{AgeRange, Category};

    #[test]
    fn catalog_filters_parse_from_flags() {
        assert_eq!(
            parse_category("apa"),
            Ok(CategoryFilter::Only(Category::AdaptedPhysicalActivity))
        );
        assert_eq!(parse_category("ALL"), Ok(CategoryFilter::All));
        assert!(parse_category("yoga").is_err());
        assert_eq!(
            parse_age_band("3-6"),
            Ok(AgeFilter::Band(AgeRange::new(3, 6)))
        );
        assert!(parse_age_band("2-5").is_err());
        assert_eq!(parse_policy("exclude"), Ok(MissingDataPolicy::Exclude));
    }

    #[test]
    fn first_open_slot_skips_full_slots() {
        let (service, _) = standard_service(EnrollmentConfig::default()).expect("standard wiring");
        let slot = first_open_slot(&service, &OfferingId("balanced-cooking".to_string()))
            .expect("catalog available");
        assert_eq!(slot, Some(SlotId("2024-03-15T1400".to_string())));

        let none = first_open_slot(&service, &OfferingId("playful-movement".to_string()))
            .expect("catalog available");
        assert_eq!(none, None);
    }

    #[tokio::test]
    async fn demo_runs_to_a_pending_registration() {
        let args = DemoArgs {
            offering: "sport-wellbeing".to_string(),
            slot: None,
            child_name: "Sam".to_string(),
            child_age: 13,
            attachments: Vec::new(),
            review: true,
            decline_terms: false,
        };
        run_demo(args).await.expect("demo completes");
    }
}
