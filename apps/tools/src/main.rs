use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use kiosk_core::{compute_region_statuses, missing_equipment, summarize};
use shared::{
    domain::AccessState,
    protocol::{AccessStatusEvent, ConfigEvent, DetectionEvent, IdentityEvent, ServerEvent},
};

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print region statuses for a detection against a requirement set.
    Coverage {
        #[arg(long, value_delimiter = ',')]
        detected: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        required: Vec<String>,
    },
    /// Print an example inbound event frame.
    SampleEvent {
        #[arg(value_enum)]
        kind: SampleKind,
        #[arg(long)]
        person: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SampleKind {
    Detection,
    Identity,
    Granted,
    Denied,
    Config,
}

fn sample_event(kind: SampleKind, person: Option<String>) -> ServerEvent {
    match kind {
        SampleKind::Detection => ServerEvent::DetectionUpdate(DetectionEvent {
            detected_classes: vec!["Helmet".into(), "Gloves".into()],
            confidence_by_class: [("Helmet".to_string(), 0.91), ("Gloves".to_string(), 0.84)]
                .into_iter()
                .collect(),
            detection_counts: [("Helmet".to_string(), 1), ("Gloves".to_string(), 2)]
                .into_iter()
                .collect(),
            face_detected: true,
        }),
        SampleKind::Identity => ServerEvent::FaceIdentified(IdentityEvent {
            matched: person.is_some(),
            name: person,
            confidence: Some(0.88),
        }),
        SampleKind::Granted => {
            let mut event = AccessStatusEvent::new(AccessState::AccessGranted)
                .with_duration_seconds(3.0);
            if let Some(person) = person {
                event = event.with_person(person);
            }
            ServerEvent::AccessStatusChange(event)
        }
        SampleKind::Denied => {
            let mut event = AccessStatusEvent::new(AccessState::AccessDenied)
                .with_message("Missing required equipment");
            if let Some(person) = person {
                event = event.with_person(person);
            }
            ServerEvent::AccessStatusChange(event)
        }
        SampleKind::Config => ServerEvent::ConfigUpdate(ConfigEvent {
            required_classes: vec!["Helmet".into(), "Gloves".into(), "Safety-vest".into()],
        }),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Coverage { detected, required } => {
            let statuses = compute_region_statuses(&detected, &required);
            for (region, status) in &statuses {
                println!(
                    "{:<12} {:<22} {:?}",
                    region.id(),
                    region.display_name(),
                    status
                );
            }
            let summary = summarize(&statuses);
            println!(
                "required={} detected={} missing={}",
                summary.required, summary.detected, summary.missing
            );
            let missing = missing_equipment(&detected, &required);
            if !missing.is_empty() {
                println!("missing equipment: {}", missing.join(", "));
            }
        }
        Command::SampleEvent { kind, person } => {
            let event = sample_event(kind, person);
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    Ok(())
}
