#![warn(clippy::pedantic)]

pub mod global;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use stratum_core::document::save::{DocumentWriter, IoTasks};
use stratum_core::document::{Document, Position};
use stratum_core::io::{self, animation::AnimationWriter, FileFormat};
use stratum_core::View;

const USAGE: &str = "usage: stratum <output> <input> [more inputs...]";

/// Pick a writer for `output`. A gif of several layers becomes an animation.
fn writer_for(
    output: &std::path::Path,
    layers: usize,
    settings: &global::preferences::Settings,
) -> AnyResult<Arc<dyn DocumentWriter>> {
    let format = FileFormat::from_path(output)
        .ok_or_else(|| anyhow::anyhow!("don't know how to write {output:?}"))?;
    if format == FileFormat::Gif && layers > 1 {
        return Ok(Arc::new(AnimationWriter {
            delay_ms: settings.animation_delay_ms,
            ping_pong: settings.ping_pong,
        }));
    }
    Ok(Arc::new(format))
}

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
    let preferences = global::preferences::Preferences::get();
    let settings = &preferences.settings;
    log::set_max_level(settings.log_level());
    if preferences.did_fail_to_load() {
        log::info!("Using default preferences.");
    }

    // Paths are OSStrings, let the system handle character encoding restrictions.
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let output = args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
    let inputs: Vec<PathBuf> = args.collect();
    if inputs.is_empty() {
        anyhow::bail!(USAGE);
    }

    // Decode everything up front, in parallel. Order is kept, the first input is the bottom.
    let decoded: Vec<_> = {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        inputs
            .into_par_iter()
            .map(|path| {
                let image = io::read_image(&path);
                (path, image)
            })
            .collect()
    };
    let mut images = decoded
        .into_iter()
        .filter_map(|(path, image)| match image {
            Err(e) => {
                log::error!("failed to open file {path:?}: {e:#}");
                None
            }
            Ok(image) => Some((path, image)),
        });
    let Some((first_path, first)) = images.next() else {
        anyhow::bail!("Failed to load any provided document.");
    };

    let mut document = Document::from_image(first, Some(first_path), None)?;
    let position = if settings.new_layers_below_active {
        Position::BelowActive
    } else {
        Position::AboveActive
    };
    for (path, image) in images {
        let name = path
            .file_stem()
            .map_or_else(|| document.generate_new_layer_name(), |stem| {
                stem.to_string_lossy().into_owned()
            });
        document.add_external_image_as_new_layer(
            Arc::new(image),
            name,
            position,
            "Open as Layer",
        )?;
    }

    let mut view = View::fitting(
        document.canvas().size(),
        settings.viewport,
        settings.auto_zoom.into(),
    );
    let events = view.subscribe();
    document.bind_view(view);
    document.set_active_in_ui(true);
    if let Some(view) = document.view() {
        log::info!(
            "{} is {}x{} with {} layers, shown at {}",
            document.name(),
            document.canvas().width(),
            document.canvas().height(),
            document.num_layers(),
            view.zoom()
        );
    }

    let writer = writer_for(&output, document.num_layers(), settings)?;
    let tasks = IoTasks::new(settings.io_threads.max(1))?;
    let pending = document
        .save_async(&output, writer, &tasks)
        .ok_or_else(|| anyhow::anyhow!("{output:?} is already being written"))?;
    let outcome = pending.wait();
    document.finish_save(pending, outcome)?;

    log::debug!("{} edits recorded", document.take_edits().len());
    for event in events.try_iter() {
        log::trace!("{event:?}");
    }

    if let Err(e) = preferences.save() {
        log::warn!("Failed to save preferences:\n{e:?}");
    };
    document.dispose();
    Ok(())
}
