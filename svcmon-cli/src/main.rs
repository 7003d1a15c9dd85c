#[cfg(windows)]
#[tokio::main]
async fn main() {
    if let Err(err) = imp::run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("svcmon only runs on Windows hosts.");
    std::process::exit(1);
}

#[cfg(windows)]
mod imp {
    use anyhow::Context;
    use clap::{Parser, Subcommand};
    use tabled::settings::Style;
    use tabled::{Table, Tabled};
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    use svcmon_core::{MonitorAction, Notification, ServiceRecord, Supervisor};
    use svcmon_scm::{ScmManager, ServiceEnumState, ServiceKind};

    /// svcmon - watch the Windows service set without polling
    #[derive(Parser, Debug)]
    #[command(name = "svcmon")]
    #[command(author, version, about, long_about = None)]
    struct Cli {
        /// Verbose output
        #[arg(short, long, global = true)]
        verbose: bool,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand, Debug)]
    enum Commands {
        /// Supervise matching services and stream their lifecycle events
        Watch {
            /// Only watch services with one of these names (case-insensitive)
            #[arg(long = "name")]
            names: Vec<String>,

            /// Only watch services whose description equals this value
            #[arg(long)]
            description: Option<String>,

            /// Emit events as JSON lines
            #[arg(long)]
            json: bool,
        },
        /// Enumerate WIN32 services once and exit
        List {
            /// Emit the listing as JSON
            #[arg(long)]
            json: bool,
        },
    }

    pub async fn run() -> anyhow::Result<()> {
        let cli = Cli::parse();

        let filter = if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();

        match cli.command {
            Commands::Watch {
                names,
                description,
                json,
            } => watch(names, description, json).await,
            Commands::List { json } => list(json),
        }
    }

    async fn watch(
        names: Vec<String>,
        description: Option<String>,
        json: bool,
    ) -> anyhow::Result<()> {
        let supervisor = Supervisor::new(move |name, config| {
            if names.is_empty() && description.is_none() {
                return true;
            }
            if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                return true;
            }
            match (&description, &config.description) {
                (Some(wanted), Some(actual)) => wanted == actual,
                _ => false,
            }
        })
        .await
        .context("failed to start supervisor")?;

        let snapshot = supervisor.services();
        if json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            print_records(&snapshot);
        }

        let mut events = supervisor
            .events()
            .context("event stream already consumed")?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(notification) => print_event(&notification, json),
                    None => break,
                },
            }
        }

        supervisor.close().await.context("shutdown failed")?;
        Ok(())
    }

    fn list(json: bool) -> anyhow::Result<()> {
        let manager = ScmManager::connect().context("failed to connect to the SCM")?;
        let services = manager
            .enumerate(ServiceKind::WIN32, ServiceEnumState::All)
            .context("failed to enumerate services")?;

        if json {
            println!("{}", serde_json::to_string(&services)?);
        } else {
            let rows: Vec<ListRow> = services
                .iter()
                .map(|s| ListRow {
                    name: s.name.clone(),
                    display_name: s.display_name.clone(),
                    state: s
                        .status
                        .current_state
                        .map(|st| st.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    pid: match s.status.process_id {
                        0 => "-".to_string(),
                        pid => pid.to_string(),
                    },
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
        }

        manager.disconnect().context("failed to disconnect")?;
        Ok(())
    }

    #[derive(Tabled)]
    struct ListRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "DISPLAY NAME")]
        display_name: String,
        #[tabled(rename = "STATE")]
        state: String,
        #[tabled(rename = "PID")]
        pid: String,
    }

    #[derive(Tabled)]
    struct WatchRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "DISPLAY NAME")]
        display_name: String,
        #[tabled(rename = "STATE")]
        state: String,
        #[tabled(rename = "START TYPE")]
        start_type: String,
    }

    fn print_records(records: &[ServiceRecord]) {
        let rows: Vec<WatchRow> = records
            .iter()
            .map(|r| WatchRow {
                name: r.name.clone(),
                display_name: r.config.display_name.clone(),
                state: r
                    .state
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                start_type: format!("{:?}", r.config.start_type),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::sharp()));
    }

    fn print_event(notification: &Notification, json: bool) {
        if json {
            if let Ok(line) = serde_json::to_string(notification) {
                println!("{line}");
            }
            return;
        }
        let triggered = notification
            .notify
            .as_ref()
            .map(|n| n.triggered.to_string())
            .unwrap_or_else(|| "-".to_string());
        let action = match notification.action {
            MonitorAction::Success => "event",
            MonitorAction::Delete => "gone",
            MonitorAction::Reload => "reload",
        };
        println!(
            "{} {:<6} {} [{}]",
            notification.timestamp.format("%H:%M:%S%.3f"),
            action,
            notification.name,
            triggered
        );
    }
}
