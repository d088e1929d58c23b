//! Persisted propagation state.
//!
//! A snapshot captures everything needed to resume a run: the grid, mixing
//! parameters, medium, trajectory, the interaction-picture state tensor and
//! (optionally) the sampled interaction tensors. Derived flavor and mass
//! compositions are stored alongside for consumers that only read spectra.

use serde::{Deserialize, Serialize};

use nuq_algebra::GeneralizedVector;
use nuq_core::errors::{ErrorInfo, NuqError};
use nuq_core::params::OscParams;
use nuq_core::types::{BasisMode, Channel, ParticleMode};
use nuq_media::rebuild_body_track;

use crate::driver::Propagator;
use crate::grid::EnergyGrid;
use crate::interactions::InteractionTensors;

/// Version tag written into every snapshot. Readers reject snapshots from a
/// newer format than they understand.
pub const FORMAT_VERSION: u32 = 1;

fn snapshot_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Serde(ErrorInfo::new(code, message))
}

/// Serializable propagation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Snapshot format version.
    pub format_version: u32,
    /// States per density matrix.
    pub dim: usize,
    /// Tracked particle channels.
    pub mode: ParticleMode,
    /// Working basis.
    pub basis: BasisMode,
    /// Grid node energies in eV.
    pub energies: Vec<f64>,
    /// Whether the grid was laid out logarithmically.
    pub log_scale: bool,
    /// Mixing angles as `(i, j, value)` triples.
    pub angles: Vec<(usize, usize, f64)>,
    /// CP phases as `(i, j, value)` triples.
    pub phases: Vec<(usize, usize, f64)>,
    /// Mass-squared splittings relative to the first state, entries `1..dim`.
    pub splittings: Vec<f64>,
    /// Neutrino-channel density matrices, one component row per node.
    pub neutrino_state: Option<Vec<Vec<f64>>>,
    /// Antineutrino-channel density matrices, one component row per node.
    pub antineutrino_state: Option<Vec<Vec<f64>>>,
    /// Neutrino-channel scalar tau fluxes per node.
    pub neutrino_scalars: Option<Vec<f64>>,
    /// Antineutrino-channel scalar tau fluxes per node.
    pub antineutrino_scalars: Option<Vec<f64>>,
    /// Derived flavor composition, indexed `[slot][node][flavor]`.
    pub flavor_composition: Vec<Vec<Vec<f64>>>,
    /// Derived mass composition, indexed `[slot][node][state]`.
    pub mass_composition: Vec<Vec<Vec<f64>>>,
    /// Numeric body type tag.
    pub body_tag: u32,
    /// Human readable body name.
    pub body_name: String,
    /// Body parameter vector.
    pub body_params: Vec<f64>,
    /// Trajectory parameter vector (initial and final position).
    pub track_params: Vec<f64>,
    /// Path position the run had reached.
    pub track_position: f64,
    /// Tau regeneration flag.
    pub tau_regeneration: bool,
    /// Positivity correction flag.
    pub positivity: bool,
    /// Tau reinjection period.
    pub tau_reg_scale: f64,
    /// Positivity correction period.
    pub positivity_scale: f64,
    /// Sampled interaction tensors, when interactions were active.
    pub tensors: Option<InteractionTensors>,
}

/// Captures the full state of a propagator. The medium and trajectory must
/// be set and the state initialized.
pub fn snapshot(prop: &Propagator) -> Result<StateSnapshot, NuqError> {
    let core = prop.core();
    if !core.state_set {
        return Err(snapshot_error("no-state", "initial state not set"));
    }
    let body = core
        .body
        .as_ref()
        .ok_or_else(|| snapshot_error("no-body", "medium not set"))?;
    let track = core
        .track
        .as_ref()
        .ok_or_else(|| snapshot_error("no-track", "trajectory not set"))?;

    let ne = core.grid.len();
    let nch = core.mode.channel_count();
    let mut channel_states: Vec<Option<Vec<Vec<f64>>>> = vec![None, None];
    let mut channel_scalars: Vec<Option<Vec<f64>>> = vec![None, None];
    for slot in 0..nch {
        let channel = core.mode.channel_at(slot).ok_or_else(|| {
            snapshot_error("bad-slot", format!("channel slot {slot} out of range"))
        })?;
        let rows = (0..ne)
            .map(|e| prop.state().rho(e, slot).components())
            .collect();
        let scalars = (0..ne).map(|e| prop.state().scalar(e, slot)).collect();
        channel_states[channel.index()] = Some(rows);
        channel_scalars[channel.index()] = Some(scalars);
    }

    let mut flavor_composition = Vec::with_capacity(nch);
    let mut mass_composition = Vec::with_capacity(nch);
    for slot in 0..nch {
        let channel = core
            .mode
            .channel_at(slot)
            .unwrap_or(Channel::Neutrino);
        let mut flavor_rows = Vec::with_capacity(ne);
        let mut mass_rows = Vec::with_capacity(ne);
        for e in 0..ne {
            let flavor_row = (0..core.dim)
                .map(|f| prop.eval_flavor_at_node(f, e, channel))
                .collect::<Result<Vec<_>, _>>()?;
            let mass_row = (0..core.dim)
                .map(|k| prop.eval_mass_at_node(k, e, channel))
                .collect::<Result<Vec<_>, _>>()?;
            flavor_rows.push(flavor_row);
            mass_rows.push(mass_row);
        }
        flavor_composition.push(flavor_rows);
        mass_composition.push(mass_rows);
    }

    let mut angles = Vec::new();
    let mut phases = Vec::new();
    for (i, j) in core.params.pairs() {
        angles.push((i, j, core.params.angle(i, j)?));
        phases.push((i, j, core.params.phase(i, j)?));
    }
    let splittings = (1..core.dim)
        .map(|i| core.params.splitting(i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StateSnapshot {
        format_version: FORMAT_VERSION,
        dim: core.dim,
        mode: core.mode,
        basis: core.basis,
        energies: core.grid.energies().to_vec(),
        log_scale: core.grid.log_scale(),
        angles,
        phases,
        splittings,
        neutrino_state: channel_states[0].take(),
        antineutrino_state: channel_states[1].take(),
        neutrino_scalars: channel_scalars[0].take(),
        antineutrino_scalars: channel_scalars[1].take(),
        flavor_composition,
        mass_composition,
        body_tag: body.tag(),
        body_name: body.name().to_string(),
        body_params: body.params(),
        track_params: track.params(),
        track_position: prop.position(),
        tau_regeneration: core.tau_regeneration,
        positivity: core.positivity,
        tau_reg_scale: core.tau_reg_scale,
        positivity_scale: core.positivity_scale,
        tensors: core.tensors.clone(),
    })
}

/// Serializes a propagator snapshot to JSON.
pub fn to_json(prop: &Propagator) -> Result<String, NuqError> {
    let snap = snapshot(prop)?;
    serde_json::to_string(&snap)
        .map_err(|e| snapshot_error("encode", format!("snapshot encoding failed: {e}")))
}

/// Rebuilds a propagator from a snapshot, positioned where the run left off.
pub fn restore(snap: &StateSnapshot) -> Result<Propagator, NuqError> {
    if snap.format_version > FORMAT_VERSION {
        return Err(snapshot_error(
            "newer-format",
            format!(
                "snapshot format {} is newer than supported format {FORMAT_VERSION}",
                snap.format_version
            ),
        ));
    }
    let grid = EnergyGrid::from_raw(snap.energies.clone(), snap.log_scale)?;
    let mut params = OscParams::zeroed(snap.dim);
    for &(i, j, value) in &snap.angles {
        params.set_angle(i, j, value)?;
    }
    for &(i, j, value) in &snap.phases {
        params.set_phase(i, j, value)?;
    }
    for (offset, &value) in snap.splittings.iter().enumerate() {
        params.set_splitting(offset + 1, value)?;
    }

    let mut prop = Propagator::assemble(snap.dim, snap.mode, grid, params, snap.tensors.clone())?;
    prop.set_basis(snap.basis);

    let (body, track) = rebuild_body_track(snap.body_tag, &snap.body_params, &snap.track_params)?;
    let x_start = track.initial_position();
    prop.set_body(body);
    prop.set_track(track);

    {
        let core = prop.core_mut();
        core.x_start = x_start;
        core.tau_regeneration = snap.tau_regeneration;
        core.positivity = snap.positivity;
        core.tau_reg_scale = snap.tau_reg_scale;
        core.positivity_scale = snap.positivity_scale;
    }

    let ne = snap.energies.len();
    for slot in 0..snap.mode.channel_count() {
        let channel = snap.mode.channel_at(slot).ok_or_else(|| {
            snapshot_error("bad-slot", format!("channel slot {slot} out of range"))
        })?;
        let (rows, scalars) = match channel {
            Channel::Neutrino => (&snap.neutrino_state, &snap.neutrino_scalars),
            Channel::Antineutrino => (&snap.antineutrino_state, &snap.antineutrino_scalars),
        };
        let rows = rows.as_ref().ok_or_else(|| {
            snapshot_error(
                "missing-channel",
                format!("snapshot lacks the {channel:?} state its mode requires"),
            )
        })?;
        if rows.len() != ne {
            return Err(snapshot_error(
                "bad-shape",
                format!("channel state has {} rows, grid has {ne} nodes", rows.len()),
            ));
        }
        for (e, row) in rows.iter().enumerate() {
            *prop.state_mut().rho_mut(e, slot) = GeneralizedVector::from_components(snap.dim, row)?;
        }
        if let Some(scalars) = scalars.as_ref() {
            if scalars.len() != ne {
                return Err(snapshot_error(
                    "bad-shape",
                    format!("scalar row has {} entries, grid has {ne} nodes", scalars.len()),
                ));
            }
            for (e, &value) in scalars.iter().enumerate() {
                *prop.state_mut().scalar_mut(e, slot) = value;
            }
        }
    }

    if let Some(track) = prop.core_mut().track.as_mut() {
        track.set_position(snap.track_position);
    }
    prop.stepper_mut().reset_position(snap.track_position);
    prop.core_mut().state_set = true;
    Ok(prop)
}

/// Deserializes a JSON snapshot and rebuilds the propagator.
pub fn from_json(data: &str) -> Result<Propagator, NuqError> {
    let snap: StateSnapshot = serde_json::from_str(data)
        .map_err(|e| snapshot_error("decode", format!("snapshot decoding failed: {e}")))?;
    restore(&snap)
}
