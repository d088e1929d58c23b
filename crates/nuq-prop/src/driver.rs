//! The propagation driver: owns the state tensor, the medium, the stepper
//! and the physics callbacks that feed it.

use std::fmt;

use nuq_algebra::GeneralizedVector;
use nuq_core::errors::{ErrorInfo, NuqError};
use nuq_core::params::OscParams;
use nuq_core::types::{BasisMode, Channel, ParticleMode, StateBasis};
use nuq_core::consts::{DEFAULT_POSITIVITY_SCALE, DEFAULT_TAU_REG_SCALE};
use nuq_media::{Body, Track};
use nuq_ode::{Rkf45, StepStats, StepperOpts, System};
use nuq_xs::{CrossSectionSource, TauDecaySource};

use crate::grid::EnergyGrid;
use crate::hamiltonian::{interaction_hamiltonian, Hamiltonian};
use crate::interactions::{InteractionTensors, RenormalizePolicy};
use crate::projectors::ProjectorSet;
use crate::state::PropState;

fn setup_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Config(ErrorInfo::new(code, message))
}

fn argument_error(code: &str, message: impl Into<String>) -> NuqError {
    NuqError::Argument(ErrorInfo::new(code, message))
}

/// Physics core handed to the stepper. Split out of [`Propagator`] so the
/// stepper can borrow the core and the state tensor disjointly.
pub(crate) struct Engine {
    pub(crate) dim: usize,
    pub(crate) mode: ParticleMode,
    pub(crate) basis: BasisMode,
    pub(crate) params: OscParams,
    pub(crate) grid: EnergyGrid,
    pub(crate) projectors: ProjectorSet,
    pub(crate) hamiltonian: Hamiltonian,
    pub(crate) tensors: Option<InteractionTensors>,
    pub(crate) body: Option<Box<dyn Body>>,
    pub(crate) track: Option<Track>,
    pub(crate) tau_regeneration: bool,
    pub(crate) positivity: bool,
    pub(crate) tau_reg_scale: f64,
    pub(crate) positivity_scale: f64,
    /// Path position the current initial state was set at; elapsed time for
    /// the interaction-picture rotation is measured from here.
    pub(crate) x_start: f64,
    pub(crate) state_set: bool,
    cur_density: f64,
    cur_ye: f64,
}

impl Engine {
    fn active_flavors(&self) -> usize {
        self.dim.min(3)
    }

    fn slot_of(&self, channel: Channel) -> Result<usize, NuqError> {
        match (self.mode, channel) {
            (ParticleMode::Both, c) => Ok(c.index()),
            (ParticleMode::Neutrino, Channel::Neutrino) => Ok(0),
            (ParticleMode::Antineutrino, Channel::Antineutrino) => Ok(0),
            (mode, channel) => Err(setup_error(
                "channel-mode-mismatch",
                format!("channel {channel:?} is not evolved in mode {mode:?}"),
            )),
        }
    }

    fn channel_of(&self, slot: usize) -> Result<Channel, NuqError> {
        self.mode
            .channel_at(slot)
            .ok_or_else(|| setup_error("bad-slot", format!("channel slot {slot} out of range")))
    }
}

impl System for Engine {
    type State = PropState;

    fn pre_derive(&mut self, x: f64) -> Result<(), NuqError> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| setup_error("no-body", "medium not set"))?;
        let track = self
            .track
            .as_mut()
            .ok_or_else(|| setup_error("no-track", "trajectory not set"))?;
        track.set_position(x);
        self.cur_density = body.density(track);
        self.cur_ye = body.electron_fraction(track);
        if self.basis != BasisMode::Mass {
            self.projectors
                .evolve_to(x - self.x_start, self.hamiltonian.h0())?;
        }
        if let Some(tensors) = self.tensors.as_mut() {
            tensors.refresh_inverse_lengths(self.cur_density);
        }
        Ok(())
    }

    fn derivative(
        &self,
        _x: f64,
        state: &PropState,
        deriv: &mut PropState,
    ) -> Result<(), NuqError> {
        let ne = self.grid.len();
        let nch = self.mode.channel_count();
        let active = self.active_flavors();
        for e in 0..ne {
            for slot in 0..nch {
                let channel = self.channel_of(slot)?;
                let hi = interaction_hamiltonian(
                    &self.projectors,
                    &self.hamiltonian,
                    self.basis,
                    slot,
                    channel,
                    e,
                    self.cur_density,
                    self.cur_ye,
                )?;
                let mut d = GeneralizedVector::commutator_i(&hi, state.rho(e, slot))?;

                if let Some(tensors) = self.tensors.as_ref() {
                    // absorption: -{Gamma, rho}
                    let mut gamma = GeneralizedVector::zero(self.dim)?;
                    for f in 0..active {
                        gamma.add_scaled(
                            0.5 * tensors.invlen_total[slot][f][e],
                            self.projectors.evolved(slot, f, e),
                        )?;
                    }
                    let abs = GeneralizedVector::anticommutator(&gamma, state.rho(e, slot))?;
                    d.add_scaled(-1.0, &abs)?;

                    // neutral-current downscattering from higher nodes;
                    // the NC cross section is flavor-universal
                    let mut active_sum = GeneralizedVector::zero(self.dim)?;
                    for f in 0..active {
                        active_sum.add_scaled(1.0, self.projectors.evolved(slot, f, e))?;
                    }
                    for e2 in e + 1..ne {
                        let weight = 0.5
                            * tensors.dnde_nc[slot][0][e2][e]
                            * tensors.invlen_nc[slot][0][e2];
                        if weight == 0.0 {
                            continue;
                        }
                        let gain =
                            GeneralizedVector::anticommutator(&active_sum, state.rho(e2, slot))?;
                        d.add_scaled(weight, &gain)?;
                    }
                }
                *deriv.rho_mut(e, slot) = d;

                // tau production feeding the scalar flux; the taus are kept
                // and converted back to neutrinos between chunks
                let scalar = if self.tau_regeneration && self.dim > 2 {
                    let tensors = self
                        .tensors
                        .as_ref()
                        .ok_or_else(|| setup_error("no-tensors", "interactions not set up"))?;
                    let mut production = 0.0;
                    for e2 in e + 1..ne {
                        let flux = self.projectors.evolved(slot, 2, e2).dot(state.rho(e2, slot))?;
                        production += flux
                            * tensors.invlen_cc[slot][2][e2]
                            * tensors.dnde_cc[slot][2][e2][e]
                            * self.grid.node_weight(e2);
                    }
                    production
                } else {
                    0.0
                };
                *deriv.scalar_mut(e, slot) = scalar;
            }
        }
        Ok(())
    }
}

/// Neutrino propagation engine: a density-matrix state over an energy grid,
/// pushed through a medium by an adaptive stepper.
pub struct Propagator {
    core: Engine,
    state: PropState,
    stepper: Rkf45,
}

impl fmt::Debug for Propagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Propagator")
            .field("dim", &self.core.dim)
            .field("mode", &self.core.mode)
            .field("basis", &self.core.basis)
            .field("nodes", &self.core.grid.len())
            .field("interactions", &self.core.tensors.is_some())
            .field("state_set", &self.core.state_set)
            .finish_non_exhaustive()
    }
}

impl Propagator {
    /// Coherent-only propagator over `grid` for `dim` states and the
    /// channels of `mode`.
    pub fn new(
        dim: usize,
        mode: ParticleMode,
        grid: EnergyGrid,
        params: OscParams,
    ) -> Result<Self, NuqError> {
        Self::assemble(dim, mode, grid, params, None)
    }

    /// Propagator with non-coherent interactions sampled from the supplied
    /// providers. Requires at least three states and a multi-node grid.
    pub fn with_interactions(
        dim: usize,
        mode: ParticleMode,
        grid: EnergyGrid,
        params: OscParams,
        xs: &dyn CrossSectionSource,
        tau: &dyn TauDecaySource,
        renormalize: RenormalizePolicy,
    ) -> Result<Self, NuqError> {
        if dim < 3 {
            return Err(setup_error(
                "too-few-states",
                "interactions need at least three states",
            ));
        }
        let tensors = InteractionTensors::build(dim, mode, &grid, xs, tau, renormalize)?;
        Self::assemble(dim, mode, grid, params, Some(tensors))
    }

    /// Relaxed single-energy propagator; interactions are unavailable.
    pub fn single_energy(
        dim: usize,
        mode: ParticleMode,
        energy_gev: f64,
        params: OscParams,
    ) -> Result<Self, NuqError> {
        Self::assemble(dim, mode, EnergyGrid::single(energy_gev)?, params, None)
    }

    pub(crate) fn assemble(
        dim: usize,
        mode: ParticleMode,
        grid: EnergyGrid,
        params: OscParams,
        tensors: Option<InteractionTensors>,
    ) -> Result<Self, NuqError> {
        if params.dim() != dim {
            return Err(argument_error(
                "dim-mismatch",
                format!(
                    "parameter set covers {} states, propagator has {dim}",
                    params.dim()
                ),
            ));
        }
        let projectors = ProjectorSet::new(dim, mode, grid.len(), &params)?;
        let hamiltonian = Hamiltonian::new(&params, &grid)?;
        let state = PropState::zeroed(dim, grid.len(), mode.channel_count())?;
        Ok(Self {
            state,
            core: Engine {
                dim,
                mode,
                basis: BasisMode::Interaction,
                params,
                grid,
                projectors,
                hamiltonian,
                tensors,
                body: None,
                track: None,
                tau_regeneration: false,
                positivity: false,
                tau_reg_scale: DEFAULT_TAU_REG_SCALE,
                positivity_scale: DEFAULT_POSITIVITY_SCALE,
                x_start: 0.0,
                state_set: false,
                cur_density: 0.0,
                cur_ye: 1.0,
            },
            stepper: Rkf45::new(StepperOpts::default()),
        })
    }

    /// Number of states per density matrix.
    pub fn dim(&self) -> usize {
        self.core.dim
    }

    /// Tracked particle channels.
    pub fn mode(&self) -> ParticleMode {
        self.core.mode
    }

    /// Working basis.
    pub fn basis(&self) -> BasisMode {
        self.core.basis
    }

    /// Energy grid the state lives on.
    pub fn grid(&self) -> &EnergyGrid {
        &self.core.grid
    }

    /// Mixing parameters.
    pub fn params(&self) -> &OscParams {
        &self.core.params
    }

    /// True when non-coherent interactions are active.
    pub fn interactions_enabled(&self) -> bool {
        self.core.tensors.is_some()
    }

    /// Current path position of the stepper.
    pub fn position(&self) -> f64 {
        self.stepper.position()
    }

    /// Switches the working basis. Must happen before the initial state is
    /// set; the choice affects how the coherent term is carried.
    pub fn set_basis(&mut self, basis: BasisMode) {
        self.core.basis = basis;
        self.core.state_set = false;
    }

    /// Replaces the stepper tolerances and step limits.
    pub fn set_stepper_opts(&mut self, opts: StepperOpts) {
        self.stepper.set_opts(opts);
    }

    /// Sets the medium the state propagates through.
    pub fn set_body(&mut self, body: Box<dyn Body>) {
        self.core.body = Some(body);
    }

    /// Sets the trajectory through the medium, rewound to its start.
    pub fn set_track(&mut self, mut track: Track) {
        track.rewind();
        self.core.track = Some(track);
        self.core.state_set = false;
    }

    /// Updates one mixing angle; the initial state must be set again
    /// afterwards so projectors and Hamiltonians are rebuilt.
    pub fn set_mixing_angle(&mut self, i: usize, j: usize, value: f64) -> Result<(), NuqError> {
        self.core.params.set_angle(i, j, value)?;
        self.core.state_set = false;
        Ok(())
    }

    /// Updates one CP phase; invalidates the current state.
    pub fn set_cp_phase(&mut self, i: usize, j: usize, value: f64) -> Result<(), NuqError> {
        self.core.params.set_phase(i, j, value)?;
        self.core.state_set = false;
        Ok(())
    }

    /// Updates one mass-squared splitting; invalidates the current state.
    pub fn set_splitting(&mut self, i: usize, value: f64) -> Result<(), NuqError> {
        self.core.params.set_splitting(i, value)?;
        self.core.state_set = false;
        Ok(())
    }

    /// Enables or disables tau regeneration. Needs both channels and active
    /// interactions, since the scalar taus are fed by charged-current
    /// absorption and decay back into both channels.
    pub fn set_tau_regeneration(&mut self, enabled: bool) -> Result<(), NuqError> {
        if enabled {
            if self.core.mode != ParticleMode::Both {
                return Err(setup_error(
                    "tau-needs-both",
                    "tau regeneration requires evolving both channels",
                ));
            }
            if self.core.tensors.is_none() {
                return Err(setup_error(
                    "tau-needs-interactions",
                    "tau regeneration requires interactions",
                ));
            }
        }
        self.core.tau_regeneration = enabled;
        Ok(())
    }

    /// Enables or disables the periodic positivity correction.
    pub fn set_positivity(&mut self, enabled: bool) {
        self.core.positivity = enabled;
    }

    /// Path-length period of the positivity correction.
    pub fn set_positivity_scale(&mut self, scale: f64) -> Result<(), NuqError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(argument_error(
                "bad-scale",
                format!("positivity scale must be positive, got {scale}"),
            ));
        }
        self.core.positivity_scale = scale;
        Ok(())
    }

    /// Path-length period of the tau reinjection.
    pub fn set_tau_reg_scale(&mut self, scale: f64) -> Result<(), NuqError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(argument_error(
                "bad-scale",
                format!("tau regeneration scale must be positive, got {scale}"),
            ));
        }
        self.core.tau_reg_scale = scale;
        Ok(())
    }

    fn require_medium(&self) -> Result<(), NuqError> {
        if self.core.body.is_none() {
            return Err(setup_error("no-body", "medium not set"));
        }
        if self.core.track.is_none() {
            return Err(setup_error("no-track", "trajectory not set"));
        }
        Ok(())
    }

    fn require_ready(&self) -> Result<(), NuqError> {
        self.require_medium()?;
        if !self.core.state_set {
            return Err(setup_error("no-state", "initial state not set"));
        }
        Ok(())
    }

    /// Restarts the run at the track's beginning: rewinds the trajectory,
    /// rebuilds projectors and Hamiltonians from the current parameters and
    /// resets the stepper clock.
    fn rearm(&mut self) -> Result<f64, NuqError> {
        let track = self
            .core
            .track
            .as_mut()
            .ok_or_else(|| setup_error("no-track", "trajectory not set"))?;
        track.rewind();
        let x0 = track.initial_position();
        self.core
            .projectors
            .reset(self.core.mode, self.core.grid.len(), &self.core.params)?;
        self.core.hamiltonian = Hamiltonian::new(&self.core.params, &self.core.grid)?;
        self.core.x_start = x0;
        self.stepper.reset_position(x0);
        Ok(x0)
    }

    fn fill_channel(&mut self, slot: usize, rows: &[&[f64]], basis: StateBasis) -> Result<(), NuqError> {
        for (e, row) in rows.iter().enumerate() {
            let mut rho = GeneralizedVector::zero(self.core.dim)?;
            for (j, &value) in row.iter().enumerate() {
                let proj = match basis {
                    StateBasis::Flavor => self.core.projectors.flavor(slot, j).clone(),
                    StateBasis::Mass => self.core.projectors.mass(j).clone(),
                };
                rho.add_scaled(value, &proj)?;
            }
            *self.state.rho_mut(e, slot) = rho;
        }
        Ok(())
    }

    fn check_row(&self, row: &[f64]) -> Result<(), NuqError> {
        if row.len() != self.core.dim {
            return Err(argument_error(
                "bad-shape",
                format!(
                    "state row has {} entries, propagator has {} states",
                    row.len(),
                    self.core.dim
                ),
            ));
        }
        if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(argument_error(
                "bad-density",
                "state entries must be finite and non-negative",
            ));
        }
        Ok(())
    }

    /// Sets the single-energy initial state of the only evolved channel.
    pub fn set_initial_state_single(
        &mut self,
        values: &[f64],
        basis: StateBasis,
    ) -> Result<(), NuqError> {
        if !self.core.grid.is_single() {
            return Err(setup_error(
                "multi-energy",
                "single-value initial state needs a single-energy setup",
            ));
        }
        if self.core.mode == ParticleMode::Both {
            return Err(setup_error(
                "needs-dual-state",
                "both channels are evolved; supply neutrino and antineutrino states",
            ));
        }
        self.require_medium()?;
        self.check_row(values)?;
        self.rearm()?;
        self.fill_channel(0, &[values], basis)?;
        self.state.clear_scalars();
        self.core.state_set = true;
        Ok(())
    }

    /// Sets the per-node initial state of the only evolved channel; `rows`
    /// carries one row of `dim` entries per grid node.
    pub fn set_initial_state(
        &mut self,
        rows: &[Vec<f64>],
        basis: StateBasis,
    ) -> Result<(), NuqError> {
        if self.core.mode == ParticleMode::Both {
            return Err(setup_error(
                "needs-dual-state",
                "both channels are evolved; supply neutrino and antineutrino states",
            ));
        }
        self.check_rows(rows)?;
        self.require_medium()?;
        self.rearm()?;
        let borrowed: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        self.fill_channel(0, &borrowed, basis)?;
        self.state.clear_scalars();
        self.core.state_set = true;
        Ok(())
    }

    /// Sets the per-node initial states of both channels.
    pub fn set_initial_state_dual(
        &mut self,
        neutrino: &[Vec<f64>],
        antineutrino: &[Vec<f64>],
        basis: StateBasis,
    ) -> Result<(), NuqError> {
        if self.core.mode != ParticleMode::Both {
            return Err(setup_error(
                "single-channel",
                "only one channel is evolved; use set_initial_state",
            ));
        }
        self.check_rows(neutrino)?;
        self.check_rows(antineutrino)?;
        self.require_medium()?;
        self.rearm()?;
        let nu: Vec<&[f64]> = neutrino.iter().map(Vec::as_slice).collect();
        let nubar: Vec<&[f64]> = antineutrino.iter().map(Vec::as_slice).collect();
        self.fill_channel(0, &nu, basis)?;
        self.fill_channel(1, &nubar, basis)?;
        self.state.clear_scalars();
        self.core.state_set = true;
        Ok(())
    }

    fn check_rows(&self, rows: &[Vec<f64>]) -> Result<(), NuqError> {
        if rows.len() != self.core.grid.len() {
            return Err(argument_error(
                "bad-shape",
                format!(
                    "state has {} rows, grid has {} nodes",
                    rows.len(),
                    self.core.grid.len()
                ),
            ));
        }
        for row in rows {
            self.check_row(row)?;
        }
        Ok(())
    }

    /// Advances the state by a path length from the current position.
    pub fn evolve(&mut self, length: f64) -> Result<StepStats, NuqError> {
        self.require_ready()?;
        let target = self.stepper.position() + length;
        self.stepper.advance(&mut self.core, &mut self.state, target)
    }

    /// Propagates the state across the whole trajectory, interleaving the
    /// positivity correction and tau reinjection at their configured scales.
    pub fn evolve_path(&mut self) -> Result<StepStats, NuqError> {
        self.require_ready()?;
        let (x0, x1) = {
            let track = self
                .core
                .track
                .as_ref()
                .ok_or_else(|| setup_error("no-track", "trajectory not set"))?;
            (track.initial_position(), track.final_position())
        };
        let span = x1 - x0;
        let mut total = StepStats::default();
        fn add(stats: StepStats, total: &mut StepStats) {
            total.accepted += stats.accepted;
            total.rejected += stats.rejected;
            total.evaluations += stats.evaluations;
        }

        if !self.core.tau_regeneration {
            if self.core.positivity {
                let scale = self.core.positivity_scale;
                let steps = (span / scale) as usize;
                for _ in 0..steps {
                    add(self.evolve(scale)?, &mut total);
                    self.apply_positivity_correction()?;
                }
                add(self.evolve(span - scale * steps as f64)?, &mut total);
                self.apply_positivity_correction()?;
            } else {
                add(self.evolve(span)?, &mut total);
            }
            return Ok(total);
        }

        let scale = if self.core.positivity {
            self.core.tau_reg_scale.min(self.core.positivity_scale)
        } else {
            self.core.tau_reg_scale
        };
        let steps = (span / scale) as usize;
        for _ in 0..steps {
            add(self.evolve(scale)?, &mut total);
            if self.core.positivity {
                self.apply_positivity_correction()?;
            }
            self.inject_tau_decay_products()?;
        }
        add(self.evolve(span - scale * steps as f64)?, &mut total);
        if self.core.positivity {
            self.apply_positivity_correction()?;
        }
        self.inject_tau_decay_products()?;
        Ok(total)
    }

    /// Evolved flavor projector for slot/flavor/node at the current path
    /// position. In the mass working basis the static projector applies.
    fn current_flavor_projector(
        &self,
        slot: usize,
        f: usize,
        e: usize,
    ) -> Result<GeneralizedVector, NuqError> {
        if self.core.basis == BasisMode::Mass {
            return Ok(self.core.projectors.flavor(slot, f).clone());
        }
        let elapsed = self.stepper.position() - self.core.x_start;
        self.core
            .projectors
            .evolved_at(slot, f, self.core.hamiltonian.h0_at(e), elapsed)
    }

    /// Clamps negative flavor content to zero by subtracting the offending
    /// flavor projection from the state.
    pub fn apply_positivity_correction(&mut self) -> Result<(), NuqError> {
        for slot in 0..self.core.mode.channel_count() {
            for e in 0..self.core.grid.len() {
                for f in 0..self.core.dim {
                    let proj = self.current_flavor_projector(slot, f, e)?;
                    let quantity = proj.dot(self.state.rho(e, slot))?;
                    if quantity < 0.0 {
                        self.state.rho_mut(e, slot).add_scaled(-quantity, &proj)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Converts the accumulated scalar tau fluxes back into neutrinos: the
    /// tau-flavor spectrum feeds the same channel, the leptonic decays feed
    /// electron and muon flavors of the opposite channel. Scalars are
    /// cleared afterwards.
    pub fn inject_tau_decay_products(&mut self) -> Result<(), NuqError> {
        if self.core.mode != ParticleMode::Both {
            return Err(setup_error(
                "tau-needs-both",
                "tau decay injection requires evolving both channels",
            ));
        }
        let tensors = self
            .core
            .tensors
            .as_ref()
            .ok_or_else(|| setup_error("no-tensors", "interactions not set up"))?;
        let ne = self.core.grid.len();
        for e1 in 0..ne {
            let mut nu_all = 0.0;
            let mut nu_lep = 0.0;
            let mut nubar_all = 0.0;
            let mut nubar_lep = 0.0;
            for e2 in e1 + 1..ne {
                let w = self.core.grid.node_weight(e2);
                nu_all += tensors.dnde_tau_all[e2][e1] * w * self.state.scalar(e2, 0);
                nu_lep += tensors.dnde_tau_lep[e2][e1] * w * self.state.scalar(e2, 0);
                nubar_all += tensors.dnde_tau_all[e2][e1] * w * self.state.scalar(e2, 1);
                nubar_lep += tensors.dnde_tau_lep[e2][e1] * w * self.state.scalar(e2, 1);
            }
            // the leptonic branching ratio is already folded into the lep kernel
            let tau_nu = self.current_flavor_projector(0, 2, e1)?;
            let e_nu = self.current_flavor_projector(0, 0, e1)?;
            let mu_nu = self.current_flavor_projector(0, 1, e1)?;
            let rho_nu = self.state.rho_mut(e1, 0);
            rho_nu.add_scaled(nu_all, &tau_nu)?;
            rho_nu.add_scaled(nubar_lep, &e_nu)?;
            rho_nu.add_scaled(nubar_lep, &mu_nu)?;

            let tau_nubar = self.current_flavor_projector(1, 2, e1)?;
            let e_nubar = self.current_flavor_projector(1, 0, e1)?;
            let mu_nubar = self.current_flavor_projector(1, 1, e1)?;
            let rho_nubar = self.state.rho_mut(e1, 1);
            rho_nubar.add_scaled(nubar_all, &tau_nubar)?;
            rho_nubar.add_scaled(nu_lep, &e_nubar)?;
            rho_nubar.add_scaled(nu_lep, &mu_nubar)?;
        }
        self.state.clear_scalars();
        Ok(())
    }

    fn check_node(&self, node: usize) -> Result<(), NuqError> {
        if node >= self.core.grid.len() {
            return Err(argument_error(
                "bad-node",
                format!(
                    "node index {node} out of range for {} grid nodes",
                    self.core.grid.len()
                ),
            ));
        }
        Ok(())
    }

    fn check_flavor(&self, flavor: usize) -> Result<(), NuqError> {
        if flavor >= self.core.dim {
            return Err(argument_error(
                "bad-flavor",
                format!(
                    "flavor index {flavor} out of range for {} states",
                    self.core.dim
                ),
            ));
        }
        Ok(())
    }

    /// Flavor content at a grid node.
    pub fn eval_flavor_at_node(
        &self,
        flavor: usize,
        node: usize,
        channel: Channel,
    ) -> Result<f64, NuqError> {
        self.check_flavor(flavor)?;
        self.check_node(node)?;
        let slot = self.core.slot_of(channel)?;
        let proj = self.current_flavor_projector(slot, flavor, node)?;
        proj.dot(self.state.rho(node, slot))
    }

    /// Mass-state content at a grid node. Mass projectors are invariant
    /// under the free evolution, so no rotation is needed.
    pub fn eval_mass_at_node(
        &self,
        state_index: usize,
        node: usize,
        channel: Channel,
    ) -> Result<f64, NuqError> {
        self.check_flavor(state_index)?;
        self.check_node(node)?;
        let slot = self.core.slot_of(channel)?;
        self.core
            .projectors
            .mass(state_index)
            .dot(self.state.rho(node, slot))
    }

    /// Flavor content at an arbitrary energy, linearly interpolated between
    /// the bracketing nodes. Interpolation is rejected in the mass working
    /// basis, where node states carry fast phases.
    pub fn eval_flavor(
        &self,
        flavor: usize,
        energy_gev: f64,
        channel: Channel,
    ) -> Result<f64, NuqError> {
        let (lo, hi, t) = self.interp_bracket(energy_gev)?;
        let a = self.eval_flavor_at_node(flavor, lo, channel)?;
        let b = self.eval_flavor_at_node(flavor, hi, channel)?;
        Ok(a * (1.0 - t) + b * t)
    }

    /// Mass-state content at an arbitrary energy, linearly interpolated.
    pub fn eval_mass(
        &self,
        state_index: usize,
        energy_gev: f64,
        channel: Channel,
    ) -> Result<f64, NuqError> {
        let (lo, hi, t) = self.interp_bracket(energy_gev)?;
        let a = self.eval_mass_at_node(state_index, lo, channel)?;
        let b = self.eval_mass_at_node(state_index, hi, channel)?;
        Ok(a * (1.0 - t) + b * t)
    }

    fn interp_bracket(&self, energy_gev: f64) -> Result<(usize, usize, f64), NuqError> {
        if self.core.basis == BasisMode::Mass {
            return Err(setup_error(
                "mass-basis-interp",
                "interpolation is unreliable in the mass working basis; evaluate at nodes",
            ));
        }
        let energy = energy_gev * nuq_core::consts::GEV;
        let interval = self.core.grid.interval_of(energy).ok_or_else(|| {
            argument_error(
                "out-of-range",
                format!("energy {energy_gev} GeV outside the grid"),
            )
        })?;
        let lo = self.core.grid.energy(interval);
        let hi = self.core.grid.energy(interval + 1);
        let t = (energy - lo) / (hi - lo);
        Ok((interval, interval + 1, t))
    }

    /// Flavor content in single-energy mode.
    pub fn eval_flavor_single(&self, flavor: usize, channel: Channel) -> Result<f64, NuqError> {
        self.require_single()?;
        self.eval_flavor_at_node(flavor, 0, channel)
    }

    /// Mass-state content in single-energy mode.
    pub fn eval_mass_single(&self, state_index: usize, channel: Channel) -> Result<f64, NuqError> {
        self.require_single()?;
        self.eval_mass_at_node(state_index, 0, channel)
    }

    fn require_single(&self) -> Result<(), NuqError> {
        if !self.core.grid.is_single() {
            return Err(setup_error(
                "multi-energy",
                "this evaluator is restricted to single-energy setups",
            ));
        }
        Ok(())
    }

    /// Scalar tau flux at a node.
    pub fn tau_flux(&self, node: usize, channel: Channel) -> Result<f64, NuqError> {
        self.check_node(node)?;
        let slot = self.core.slot_of(channel)?;
        Ok(self.state.scalar(node, slot))
    }

    pub(crate) fn core(&self) -> &Engine {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut Engine {
        &mut self.core
    }

    pub(crate) fn state(&self) -> &PropState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut PropState {
        &mut self.state
    }

    pub(crate) fn stepper_mut(&mut self) -> &mut Rkf45 {
        &mut self.stepper
    }
}
