use crate::directory::Directory;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use permit_core::application::{ApplicationStore, Contact, Permission};
use permit_core::types::ApplicationStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum AppSubcommand {
    /// Start tracking an application already submitted to the registry
    Track {
        /// Application name
        #[arg(long)]
        name: String,

        /// Registry-assigned id of the submitted application
        #[arg(long)]
        external_id: i64,

        /// Contact email with edit permission (repeatable)
        #[arg(long = "contact")]
        contacts: Vec<String>,

        /// Contact email with view-only permission (repeatable)
        #[arg(long = "viewer")]
        viewers: Vec<String>,
    },

    /// List tracked applications
    List,

    /// Overwrite the registry-facing status of a tracked application
    SetStatus {
        /// Local id of the application (see `app list`)
        id: i64,

        /// New status, e.g. HANDLING or DECISION
        status: String,

        /// Also overwrite the registry-assigned identifier
        #[arg(long)]
        identifier: Option<String>,
    },
}

pub fn run(root: &Path, subcommand: AppSubcommand, json: bool) -> anyhow::Result<()> {
    let directory = Directory::load(root).context("failed to load directory")?;

    match subcommand {
        AppSubcommand::Track {
            name,
            external_id,
            contacts,
            viewers,
        } => {
            let contacts: Vec<Contact> = contacts
                .into_iter()
                .map(|email| Contact {
                    email,
                    permissions: vec![Permission::ViewApplications, Permission::EditApplications],
                })
                .chain(viewers.into_iter().map(|email| Contact {
                    email,
                    permissions: vec![Permission::ViewApplications],
                }))
                .collect();

            let app = directory.track(&name, external_id, contacts)?;
            if json {
                return print_json(&app);
            }
            println!("Tracking '{}' (id {}, registry id {external_id})", app.name, app.id);
            Ok(())
        }

        AppSubcommand::SetStatus {
            id,
            status,
            identifier,
        } => {
            let status: ApplicationStatus = status.parse()?;
            let mut app = directory
                .applications()
                .into_iter()
                .find(|a| a.application.id == id)
                .with_context(|| format!("no tracked application with id {id}"))?
                .application;
            let identifier = identifier
                .or_else(|| app.identifier.clone())
                .unwrap_or_default();
            directory.update_registry_fields(id, status, &identifier)?;
            if json {
                app.external_status = Some(status);
                app.identifier = Some(identifier);
                return print_json(&app);
            }
            println!("Application {id} set to {status}");
            Ok(())
        }

        AppSubcommand::List => {
            let apps = directory.applications();
            if json {
                return print_json(&apps);
            }
            if apps.is_empty() {
                println!("No tracked applications. Run: permit-sync app track --name \"...\" --external-id <id>");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = apps
                .iter()
                .map(|a| {
                    vec![
                        a.application.id.to_string(),
                        a.application.name.clone(),
                        a.application
                            .external_id
                            .map(|id| id.to_string())
                            .unwrap_or_default(),
                        a.application
                            .identifier
                            .clone()
                            .unwrap_or_default(),
                        a.application
                            .external_status
                            .map(|s| s.to_string())
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "REGISTRY ID", "IDENTIFIER", "STATUS"], rows);
            Ok(())
        }
    }
}
