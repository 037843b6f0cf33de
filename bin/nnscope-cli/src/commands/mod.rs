// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the setup they share.

pub mod bench;
pub mod inspect;
pub mod validate;

use anyhow::Context;
use model_ir::{ModelLoader, ModelManifest};
use resource_monitor::{HeapMonitor, PaintedStack, StackRegion};
use runtime::{HarnessConfig, Ready, Session, SimPlatform};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Bytes of simulated stack the engines touch while running.
const SIM_STACK_BYTES: usize = 16 * 1024;

/// Installs the global tracing subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Harness settings plus whether they came from a file.
pub struct Settings {
    pub config: HarnessConfig,
    /// The backend was chosen explicitly and must match the model.
    pub pinned_backend: bool,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(p) => {
            let config = HarnessConfig::from_file(p)
                .with_context(|| format!("failed to load config from '{}'", p.display()))?;
            Ok(Settings {
                config,
                pinned_backend: true,
            })
        }
        None => Ok(Settings {
            config: HarnessConfig::default(),
            pinned_backend: false,
        }),
    }
}

/// Loads the model image named on the command line or in the config.
pub fn load_model(settings: &mut Settings, model: Option<PathBuf>) -> anyhow::Result<ModelManifest> {
    let path = model
        .or_else(|| settings.config.model_path.clone())
        .context("no model given: pass --model or set model_path in the config")?;
    let manifest = ModelLoader::load_manifest(&path)
        .with_context(|| format!("failed to load model from '{}'", path.display()))?;
    if !settings.pinned_backend {
        settings.config.backend = manifest.format;
    }
    settings.config.model_path = Some(path);
    Ok(manifest)
}

/// Brings a session on a simulated board up to `Ready`.
pub fn open_session(
    config: HarnessConfig,
    manifest: &ModelManifest,
    heap: Option<&'static dyn HeapMonitor>,
) -> anyhow::Result<(SimPlatform, Session<Ready>)> {
    let region = StackRegion::new(SIM_STACK_BYTES)?;
    let platform = SimPlatform::new().with_stack(region.clone());
    let mut session = Session::new(config, platform.counter().clone(), platform.factory())?
        .with_stack_monitor(PaintedStack::new(region));
    if let Some(heap) = heap {
        session = session.with_heap_monitor(heap);
    }
    let ready = session.create(manifest)?.init()?.prepare()?;
    Ok((platform, ready))
}
