#![warn(clippy::pedantic)]

pub mod global;
pub mod script;

use anyhow::Result as AnyResult;

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let settings = global::settings::Settings::get();
    if settings.did_fail_to_load() {
        if let Err(e) = settings.save() {
            log::warn!("Failed to save default settings:\n{e:?}");
        }
    }

    let replay_succeeded = {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        // Args are a simple list of script paths to replay.
        // Paths are OSStrings, let the system handle character encoding restrictions.
        let paths: Vec<std::path::PathBuf> = std::env::args_os().skip(1).map(Into::into).collect();
        if paths.is_empty() {
            log::warn!("No scripts given. Usage: tilepaint <script.toml>...");
        }
        // Did we have at least one success? No paths is a success.
        let had_success: std::sync::atomic::AtomicBool = paths.is_empty().into();
        paths.into_par_iter().for_each(|path| {
            match script::replay(&path, settings) {
                Err(e) => {
                    log::error!("failed to replay {path:?}: {e:#}");
                }
                Ok(out) => {
                    log::info!("{path:?} rendered to {out:?}");
                    had_success.store(true, std::sync::atomic::Ordering::Relaxed);
                }
            }
        });

        had_success.into_inner()
    };
    // False if every script failed.
    if !replay_succeeded {
        anyhow::bail!("Failed to replay any provided script.");
    }
    Ok(())
}
