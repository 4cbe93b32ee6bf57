mod ports;
mod surface;
mod tui;

use clap::Parser;

use globed_core::config::MemoryStore;
use globed_core::core::Core;
use globed_core::directory::CentralServer;
use globed_core::integrity::{self, IntegrityReport, ResourceIntegrityPort};
use globed_core::telemetry::Severity;

use ports::HostnameFingerprint;
use surface::HarnessSurface;

/// Drives `globed-core` outside of any real game engine: a terminal
/// dashboard standing in for the mod's in-game overlay. Flags follow the
/// mod's `globed-*` launch-argument convention (`spec.md` §6 CLI/env).
#[derive(Parser)]
#[command(name = "globed-harness")]
#[command(about = "Headless test harness for globed-core")]
struct Args {
    /// Central server to seed the directory with.
    #[arg(long, default_value = "https://central.globed.example.com")]
    central: String,

    #[arg(long = "globed-skip-resource-check")]
    skip_resource_check: bool,

    #[arg(long = "globed-no-ssl-verify")]
    no_ssl_verify: bool,

    #[arg(long = "globed-debug-interpolation")]
    debug_interpolation: bool,
}

struct AlwaysIntact;
impl ResourceIntegrityPort for AlwaysIntact {
    fn check_resources(&self) -> IntegrityReport {
        IntegrityReport {
            all_resources_present: true,
            severely_broken: false,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let surface = Box::new(HarnessSurface::default());
    let store = Box::new(MemoryStore::default());
    let centrals = vec![CentralServer {
        name: "main".into(),
        url: args.central.clone(),
    }];

    let mut core = Core::new(surface, store, centrals, &HostnameFingerprint);

    let mut settings = core.settings().clone();
    settings.no_ssl_verify = args.no_ssl_verify;
    if args.debug_interpolation {
        log::info!("debug-interpolation: interpolator skip/clamp events will be logged at debug level");
    }
    core.update_settings(settings);

    if !args.skip_resource_check {
        let report = integrity::check_resources(&AlwaysIntact, &core.telemetry);
        if !report.all_resources_present {
            log::warn!("resource integrity check reported missing assets");
        }
    } else {
        core.telemetry.push(Severity::Debug, "resource integrity check skipped (globed-skip-resource-check)");
    }

    let mut dashboard = tui::Dashboard::new()?;
    let result = dashboard.run(&mut core);
    drop(dashboard);
    result?;

    Ok(())
}
