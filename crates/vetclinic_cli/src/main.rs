//! `vetclinic` command-line front end.
//!
//! # Responsibility
//! - Expose every clinic service operation as a subcommand.
//! - Print results as pretty JSON on stdout and errors on stderr.
//!
//! Exit codes: `0` success, `1` client error (bad input, missing record),
//! `2` storage or environment failure.

mod config;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use vetclinic_core::db::open_db;
use vetclinic_core::{
    init_logging, AnimalPatch, AppointmentCascadePatch, AppointmentPatch, ClinicError,
    ClinicService, EntityKind, GuardianPatch, NewAnimal, NewAppointment, NewGuardian,
};

#[derive(Parser)]
#[command(name = "vetclinic", version, about = "Veterinary clinic records")]
struct Cli {
    /// SQLite database file [env: VETCLINIC_DB_PATH, default: vet.db]
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error [env: VETCLINIC_LOG_LEVEL]
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files [env: VETCLINIC_LOG_DIR]
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Guardians (tutores)
    #[command(subcommand)]
    Guardian(GuardianCmd),
    /// Animals
    #[command(subcommand)]
    Animal(AnimalCmd),
    /// Appointments (agendamentos)
    #[command(subcommand)]
    Appointment(AppointmentCmd),
    /// Look up any record by kind and id
    Get { kind: Kind, id: i64 },
    /// Case-insensitive name search; appointments match the veterinarian
    Search { kind: Kind, fragment: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Guardian,
    Animal,
    Appointment,
}

impl From<Kind> for EntityKind {
    fn from(value: Kind) -> Self {
        match value {
            Kind::Guardian => EntityKind::Guardian,
            Kind::Animal => EntityKind::Animal,
            Kind::Appointment => EntityKind::Appointment,
        }
    }
}

#[derive(Subcommand)]
enum GuardianCmd {
    Create {
        #[arg(long)]
        name: String,
        /// Explicit id; assigned by the store when omitted
        #[arg(long)]
        id: Option<i64>,
    },
    Get {
        id: i64,
    },
    List,
    Search {
        fragment: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
    },
    /// Deletes the guardian, its animals and their appointments
    Delete {
        id: i64,
    },
    /// Animals of the first guardian whose name contains FRAGMENT
    Animals {
        fragment: String,
    },
}

#[derive(Subcommand)]
enum AnimalCmd {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        species: String,
        #[arg(long)]
        guardian_id: i64,
        #[arg(long)]
        id: Option<i64>,
    },
    Get {
        id: i64,
    },
    List,
    Search {
        fragment: String,
    },
    /// Animals whose species contains FRAGMENT
    Species {
        fragment: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        species: Option<String>,
        /// Relinks the animal to another guardian
        #[arg(long)]
        guardian_id: Option<i64>,
    },
    /// Deletes the animal and its appointments
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum AppointmentCmd {
    Create {
        #[arg(long, value_name = "DD-MM-YYYY HH:mm")]
        at: String,
        #[arg(long)]
        vet: String,
        #[arg(long)]
        animal_id: i64,
        #[arg(long)]
        id: Option<i64>,
    },
    Get {
        id: i64,
    },
    List,
    /// Appointments on one calendar day
    On {
        #[arg(value_name = "DD-MM-YYYY")]
        date: String,
    },
    /// Appointments whose veterinarian contains FRAGMENT
    Vet {
        fragment: String,
    },
    /// Updates the appointment and, optionally, its animal and guardian
    Update {
        id: i64,
        #[arg(long, value_name = "DD-MM-YYYY HH:mm")]
        at: Option<String>,
        #[arg(long)]
        vet: Option<String>,
        /// Relinks the appointment to another animal
        #[arg(long)]
        animal_id: Option<i64>,
        #[arg(long)]
        animal_name: Option<String>,
        #[arg(long)]
        animal_species: Option<String>,
        #[arg(long)]
        animal_guardian_id: Option<i64>,
        #[arg(long)]
        guardian_name: Option<String>,
    },
    Delete {
        id: i64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.db, cli.log_level, cli.log_dir);
    let log_dir = config.log_dir.to_str().ok_or_else(|| {
        anyhow!(
            "log directory `{}` is not valid UTF-8",
            config.log_dir.display()
        )
    })?;
    init_logging(&config.log_level, log_dir).context("failed to initialize logging")?;

    let mut conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    let mut service = ClinicService::try_new(&mut conn)?;

    let output = dispatch(&mut service, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn dispatch(service: &mut ClinicService<'_>, command: Command) -> Result<Value> {
    match command {
        Command::Guardian(cmd) => guardian(service, cmd),
        Command::Animal(cmd) => animal(service, cmd),
        Command::Appointment(cmd) => appointment(service, cmd),
        Command::Get { kind, id } => to_json(service.get_by_id(kind.into(), id)?),
        Command::Search { kind, fragment } => {
            to_json(service.search_by_name(kind.into(), &fragment)?)
        }
    }
}

fn guardian(service: &mut ClinicService<'_>, cmd: GuardianCmd) -> Result<Value> {
    match cmd {
        GuardianCmd::Create { name, id } => {
            info!("event=cli_command module=cli status=start command=guardian_create");
            let draft = NewGuardian {
                id,
                name: Some(name),
            };
            to_json(service.create_guardian(&draft)?)
        }
        GuardianCmd::Get { id } => to_json(service.get_guardian(id)?),
        GuardianCmd::List => to_json(service.list_guardians()?),
        GuardianCmd::Search { fragment } => to_json(service.search_guardians(&fragment)?),
        GuardianCmd::Update { id, name } => {
            info!("event=cli_command module=cli status=start command=guardian_update");
            to_json(service.update_guardian(id, &GuardianPatch { name })?)
        }
        GuardianCmd::Delete { id } => {
            info!("event=cli_command module=cli status=start command=guardian_delete");
            to_json(service.delete_guardian(id)?)
        }
        GuardianCmd::Animals { fragment } => to_json(service.animals_of_guardian(&fragment)?),
    }
}

fn animal(service: &mut ClinicService<'_>, cmd: AnimalCmd) -> Result<Value> {
    match cmd {
        AnimalCmd::Create {
            name,
            species,
            guardian_id,
            id,
        } => {
            info!("event=cli_command module=cli status=start command=animal_create");
            let draft = NewAnimal {
                id,
                ..NewAnimal::new(name, species, guardian_id)
            };
            to_json(service.create_animal(&draft)?)
        }
        AnimalCmd::Get { id } => to_json(service.get_animal(id)?),
        AnimalCmd::List => to_json(service.list_animals()?),
        AnimalCmd::Search { fragment } => to_json(service.search_animals(&fragment)?),
        AnimalCmd::Species { fragment } => to_json(service.filter_by_species(&fragment)?),
        AnimalCmd::Update {
            id,
            name,
            species,
            guardian_id,
        } => {
            info!("event=cli_command module=cli status=start command=animal_update");
            let patch = AnimalPatch {
                name,
                species,
                guardian_id,
            };
            to_json(service.update_animal(id, &patch)?)
        }
        AnimalCmd::Delete { id } => {
            info!("event=cli_command module=cli status=start command=animal_delete");
            to_json(service.delete_animal(id)?)
        }
    }
}

fn appointment(service: &mut ClinicService<'_>, cmd: AppointmentCmd) -> Result<Value> {
    match cmd {
        AppointmentCmd::Create {
            at,
            vet,
            animal_id,
            id,
        } => {
            info!("event=cli_command module=cli status=start command=appointment_create");
            let draft = NewAppointment {
                id,
                ..NewAppointment::new(at, vet, animal_id)
            };
            to_json(service.create_appointment(&draft)?)
        }
        AppointmentCmd::Get { id } => to_json(service.get_appointment(id)?),
        AppointmentCmd::List => to_json(service.list_appointments()?),
        AppointmentCmd::On { date } => {
            to_json(service.filter_appointments_by_date_text(&date)?)
        }
        AppointmentCmd::Vet { fragment } => {
            to_json(service.filter_appointments_by_veterinarian(&fragment)?)
        }
        AppointmentCmd::Update {
            id,
            at,
            vet,
            animal_id,
            animal_name,
            animal_species,
            animal_guardian_id,
            guardian_name,
        } => {
            info!("event=cli_command module=cli status=start command=appointment_update");
            let patch = AppointmentCascadePatch {
                appointment: AppointmentPatch {
                    scheduled_at: at,
                    veterinarian: vet,
                    animal_id,
                },
                animal: Some(AnimalPatch {
                    name: animal_name,
                    species: animal_species,
                    guardian_id: animal_guardian_id,
                })
                .filter(|patch| !patch.is_empty()),
                guardian: guardian_name.map(|name| GuardianPatch { name: Some(name) }),
            };

            let record = if patch.animal.is_none() && patch.guardian.is_none() {
                service.update_appointment(id, &patch.appointment)?
            } else {
                service.update_appointment_cascading(id, &patch)?
            };
            to_json(record)
        }
        AppointmentCmd::Delete { id } => {
            info!("event=cli_command module=cli status=start command=appointment_delete");
            to_json(service.delete_appointment(id)?)
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ClinicError>() {
        Some(clinic) if clinic.is_client_error() => 1,
        _ => 2,
    }
}
