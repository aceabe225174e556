//! Arena: one tick of combat over a set of entities.
//!
//! Composes the machines the way a game loop would. Each tick:
//! 1. Advance defense and combo state, integrate movement
//! 2. Rebuild the spatial grid from living entities
//! 3. Advance telegraphs (dead attackers are reset)
//! 4. Run each fresh Active telegraph through the grid
//! 5. Route every hit through the target's defense, then the resolver
//!
//! Entities only touch their own state during a pass, so a pass could be
//! split across workers by entity. The grid is shared behind an `Arc`.

use crate::combo::{ComboEvent, ComboMultipliers, ComboState, ComboTracker, WeaponType};
use crate::config::CombatConfig;
use crate::damage::{DamageEvent, DamageResolver};
use crate::defense::{DefenseMachine, DefenseState};
use crate::spatial::{SpatialEntity, SpatialGrid};
use crate::store::ComponentStore;
use crate::telegraph::{AttackPattern, TelegraphMachine, TelegraphPhase, TelegraphState};
use riposte_common::{heading, CombatResult, EntityId, Vec2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Fraction of knockback velocity lost per second.
pub const VELOCITY_DAMPING: f32 = 8.0;

/// Team index. Telegraphs never hit their own team.
pub type Team = u8;

/// Health, armor and placement of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Current armor.
    pub armor: f32,
    /// World position.
    pub position: Vec2,
    /// Knockback velocity, damped every tick.
    pub velocity: Vec2,
    /// Dodge velocity, applied only during i-frames.
    pub dash: Vec2,
    /// Facing angle in radians.
    pub facing: f32,
    /// Collision radius.
    pub radius: f32,
    /// Team index.
    pub team: Team,
}

impl Vitals {
    /// Creates vitals at full health with no armor.
    #[must_use]
    pub fn new(max_health: f32, position: Vec2, team: Team) -> Self {
        Self {
            health: max_health,
            max_health,
            armor: 0.0,
            position,
            velocity: Vec2::ZERO,
            dash: Vec2::ZERO,
            facing: 0.0,
            radius: 0.5,
            team,
        }
    }

    /// Set armor.
    #[must_use]
    pub fn with_armor(mut self, armor: f32) -> Self {
        self.armor = armor.max(0.0);
        self
    }

    /// Set facing.
    #[must_use]
    pub fn with_facing(mut self, facing: f32) -> Self {
        self.facing = facing;
        self
    }

    /// Set collision radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    /// Whether health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Health as a fraction of maximum.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }
}

/// Something that happened during a tick or command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Damage landed.
    Hit {
        /// Attacker.
        attacker: EntityId,
        /// Target.
        target: EntityId,
        /// Health lost.
        health_damage: f32,
        /// Armor lost.
        armor_damage: f32,
    },
    /// A dodge or perfect parry negated a hit.
    Negated {
        /// Attacker.
        attacker: EntityId,
        /// Target.
        target: EntityId,
    },
    /// A combo step staggered its target.
    Staggered {
        /// Attacker.
        attacker: EntityId,
        /// Target.
        target: EntityId,
    },
    /// Target health reached zero.
    Killed {
        /// Attacker.
        attacker: EntityId,
        /// Target.
        target: EntityId,
    },
    /// Overkill past the gib threshold.
    Gibbed {
        /// Target.
        target: EntityId,
    },
    /// A telegraph changed phase.
    Telegraph {
        /// Attacker.
        entity: EntityId,
        /// Phase left.
        from: TelegraphPhase,
        /// Phase entered.
        to: TelegraphPhase,
    },
    /// A combo changed state.
    Combo {
        /// Entity owning the combo.
        entity: EntityId,
        /// What happened.
        event: ComboEvent,
    },
}

/// Entities, their combat state and the machines driving it.
#[derive(Debug)]
pub struct CombatArena {
    config: CombatConfig,
    resolver: DamageResolver,
    defense: DefenseMachine,
    telegraph: TelegraphMachine,
    combo: ComboTracker,
    grid: Arc<SpatialGrid>,
    vitals: ComponentStore<Vitals>,
    defenses: ComponentStore<DefenseState>,
    telegraphs: ComponentStore<TelegraphState>,
    combos: ComponentStore<ComboState>,
    pending: Vec<CombatEvent>,
    rng: fastrand::Rng,
    ticks: u64,
}

impl CombatArena {
    /// Creates an arena with the configured genre's presets and catalogs.
    pub fn new(config: CombatConfig) -> CombatResult<Self> {
        let defense = DefenseMachine::from_config(&config);
        let telegraph = TelegraphMachine::from_config(&config);
        let combo = ComboTracker::from_config(&config);
        Self::with_machines(config, defense, telegraph, combo)
    }

    /// Creates an arena with explicit machines, e.g. RON-loaded catalogs.
    pub fn with_machines(
        config: CombatConfig,
        defense: DefenseMachine,
        telegraph: TelegraphMachine,
        combo: ComboTracker,
    ) -> CombatResult<Self> {
        config.validate()?;
        let grid = Arc::new(SpatialGrid::new(config.cell_size)?);
        let rng = config
            .rng_seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        debug!(genre = %config.genre(), difficulty = ?config.difficulty, "arena created");

        Ok(Self {
            resolver: config.resolver(),
            config,
            defense,
            telegraph,
            combo,
            grid,
            vitals: ComponentStore::new(),
            defenses: ComponentStore::new(),
            telegraphs: ComponentStore::new(),
            combos: ComponentStore::new(),
            pending: Vec::new(),
            rng,
            ticks: 0,
        })
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Shared handle to the spatial grid.
    #[must_use]
    pub fn grid(&self) -> Arc<SpatialGrid> {
        Arc::clone(&self.grid)
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Adds an entity with fresh combat state.
    pub fn spawn(&mut self, vitals: Vitals) -> EntityId {
        let id = EntityId::next();
        let mut defense = self.defense.spawn_state();
        defense.facing = vitals.facing;
        self.vitals.insert(id, vitals);
        self.defenses.insert(id, defense);
        self.telegraphs.insert(id, TelegraphState::new());
        self.combos.insert(id, ComboState::new());
        debug!(%id, team = vitals.team, "spawned");
        id
    }

    /// Removes an entity and all its state.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.defenses.remove(id);
        self.telegraphs.remove(id);
        self.combos.remove(id);
        self.vitals.remove(id).is_some()
    }

    /// Number of entities, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vitals.len()
    }

    /// Whether the arena has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vitals.is_empty()
    }

    /// Living entities on `team`.
    #[must_use]
    pub fn alive_on_team(&self, team: Team) -> usize {
        self.vitals
            .iter()
            .filter(|(_, v)| v.team == team && v.is_alive())
            .count()
    }

    /// Vitals of `id`.
    #[must_use]
    pub fn vitals(&self, id: EntityId) -> Option<&Vitals> {
        self.vitals.get(id)
    }

    /// Mutable vitals of `id`.
    pub fn vitals_mut(&mut self, id: EntityId) -> Option<&mut Vitals> {
        self.vitals.get_mut(id)
    }

    /// Defense state of `id`.
    #[must_use]
    pub fn defense_state(&self, id: EntityId) -> Option<&DefenseState> {
        self.defenses.get(id)
    }

    /// Telegraph state of `id`.
    #[must_use]
    pub fn telegraph_state(&self, id: EntityId) -> Option<&TelegraphState> {
        self.telegraphs.get(id)
    }

    /// Combo state of `id`.
    #[must_use]
    pub fn combo_state(&self, id: EntityId) -> Option<&ComboState> {
        self.combos.get(id)
    }

    /// Combo multipliers `id` would attack with.
    #[must_use]
    pub fn combo_multipliers(&self, id: EntityId) -> ComboMultipliers {
        self.combos
            .get(id)
            .map_or(ComboMultipliers::IDENTITY, |c| self.combo.multipliers(c))
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Starts a dodge towards `direction`.
    pub fn dodge(&mut self, id: EntityId, direction: Vec2) -> CombatResult<bool> {
        if !self.vitals.try_get(id)?.is_alive() {
            return Ok(false);
        }
        let facing = self.vitals.try_get(id)?.facing;
        let state = self.defenses.try_get_mut(id)?;
        state.facing = facing;
        Ok(self.defense.initiate_dodge(state, direction))
    }

    /// Starts a parry.
    pub fn parry(&mut self, id: EntityId) -> CombatResult<bool> {
        if !self.vitals.try_get(id)?.is_alive() {
            return Ok(false);
        }
        Ok(self.defense.initiate_parry(self.defenses.try_get_mut(id)?))
    }

    /// Raises a block.
    pub fn block(&mut self, id: EntityId) -> CombatResult<bool> {
        if !self.vitals.try_get(id)?.is_alive() {
            return Ok(false);
        }
        Ok(self.defense.initiate_block(self.defenses.try_get_mut(id)?))
    }

    /// Lowers a block.
    pub fn cancel_block(&mut self, id: EntityId) -> CombatResult<bool> {
        Ok(self.defense.cancel_block(self.defenses.try_get_mut(id)?))
    }

    /// Telegraphs an attack at `target_pos`.
    pub fn attack(&mut self, id: EntityId, target_pos: Vec2) -> CombatResult<bool> {
        let vitals = *self.vitals.try_get(id)?;
        let state = self.telegraphs.try_get_mut(id)?;
        Ok(self
            .telegraph
            .initiate_attack(state, vitals.position, target_pos, vitals.health))
    }

    /// Starts a combo. The `Started` event is reported by the next tick.
    pub fn start_combo(&mut self, id: EntityId, weapon: WeaponType) -> CombatResult<bool> {
        if !self.vitals.try_get(id)?.is_alive() {
            return Ok(false);
        }
        let state = self.combos.try_get_mut(id)?;
        let Some(event) = self.combo.begin(state, weapon) else {
            return Ok(false);
        };
        self.pending.push(CombatEvent::Combo { entity: id, event });
        Ok(true)
    }

    /// Buffers a combo follow-up input.
    pub fn buffer_combo(&mut self, id: EntityId) -> CombatResult<bool> {
        Ok(self.combo.buffer_input(self.combos.try_get_mut(id)?))
    }

    /// Lands a direct attack from `attacker` on `target`.
    ///
    /// Damage is scaled by the attacker's combo multipliers, backstab window
    /// and perfect-parry counter, then routed through the target's defense
    /// and the resolver. The counter is consumed only by a landed hit, which
    /// also counts towards the attacker's combo and may stagger the target.
    pub fn player_strike(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        base_damage: f32,
    ) -> CombatResult<Vec<CombatEvent>> {
        let source = *self.vitals.try_get(attacker)?;
        let victim = *self.vitals.try_get(target)?;
        let mut events = Vec::new();
        if !source.is_alive() || !victim.is_alive() {
            return Ok(events);
        }

        let multipliers = self.combo_multipliers(attacker);
        let mut damage = base_damage * multipliers.damage;
        if let Some(defense) = self.defenses.get(attacker) {
            if self.defense.is_backstab_window(defense) {
                damage *= self.config.backstab_multiplier;
            }
            damage *= self.defense.counter_multiplier(defense);
        }

        let landed = self.apply_hit(attacker, target, damage, multipliers.knockback, &mut events);
        if landed {
            if let Some(defense) = self.defenses.get_mut(attacker) {
                self.defense.take_counter_multiplier(defense);
            }
            let mut staggered = false;
            if let Some(combo) = self.combos.get_mut(attacker) {
                self.combo.record_hit(combo, damage);
                staggered = self.combo.roll_stagger(combo, &mut self.rng);
            }
            let target_alive = self.vitals.get(target).is_some_and(Vitals::is_alive);
            if staggered && target_alive {
                if let Some(telegraph) = self.telegraphs.get_mut(target) {
                    telegraph.reset();
                }
                events.push(CombatEvent::Staggered { attacker, target });
            }
        }
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advances every entity by `dt` seconds.
    ///
    /// Returns the events of this tick, preceded by any queued by commands
    /// since the previous tick.
    pub fn tick(&mut self, dt: f32) -> Vec<CombatEvent> {
        let dt = dt.max(0.0);
        let mut events = std::mem::take(&mut self.pending);
        let ids = self.vitals.sorted_ids();

        for &id in &ids {
            let Some(vitals) = self.vitals.get_mut(id) else {
                continue;
            };
            if let Some(defense) = self.defenses.get_mut(id) {
                defense.facing = vitals.facing;
                self.defense.update(defense, dt);
                if let Some(impulse) = self.defense.take_dodge_impulse(defense) {
                    vitals.dash = impulse;
                }
                if !defense.is_invulnerable() {
                    vitals.dash = Vec2::ZERO;
                }
            }
            vitals.position += (vitals.velocity + vitals.dash) * dt;
            vitals.velocity *= (1.0 - VELOCITY_DAMPING * dt).max(0.0);

            if let Some(combo) = self.combos.get_mut(id) {
                if let Some(event) = self.combo.update(combo, dt) {
                    events.push(CombatEvent::Combo { entity: id, event });
                }
            }
        }

        self.grid.rebuild(
            self.vitals
                .iter()
                .filter(|(_, v)| v.is_alive())
                .map(|(id, v)| SpatialEntity::new(id, v.position, v.radius)),
        );

        for &id in &ids {
            let health = self.vitals.get(id).map_or(0.0, |v| v.health);
            let Some(state) = self.telegraphs.get_mut(id) else {
                continue;
            };
            if let Some(t) = self.telegraph.update(state, dt, health) {
                events.push(CombatEvent::Telegraph {
                    entity: id,
                    from: t.from,
                    to: t.to,
                });
            }
        }

        for &attacker in &ids {
            self.resolve_strike(attacker, &mut events);
        }

        self.ticks += 1;
        events
    }

    /// Runs `attacker`'s damage pass if its telegraph is freshly Active.
    fn resolve_strike(&mut self, attacker: EntityId, events: &mut Vec<CombatEvent>) {
        let Some(source) = self.vitals.get(attacker).copied() else {
            return;
        };
        if !source.is_alive() {
            return;
        }
        let radius = match self.telegraphs.get(attacker) {
            Some(s) if s.phase() == TelegraphPhase::Active && !s.has_hit() => {
                s.pattern().map_or(0.0, AttackPattern::query_radius)
            },
            _ => return,
        };

        let vitals = &self.vitals;
        let candidates: Vec<_> = self
            .grid
            .query_entities(source.position.x, source.position.y, radius)
            .into_iter()
            .filter(|c| vitals.get(c.id).is_some_and(|v| v.team != source.team))
            .collect();

        let Some(state) = self.telegraphs.get_mut(attacker) else {
            return;
        };
        let hits = self.telegraph.strike(state, attacker, source.position, candidates);
        for hit in hits {
            self.apply_hit(hit.attacker, hit.target, hit.damage, hit.knockback, events);
        }
    }

    /// Routes one hit through defense and the resolver. Returns whether
    /// damage landed.
    fn apply_hit(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        raw_damage: f32,
        knockback: f32,
        events: &mut Vec<CombatEvent>,
    ) -> bool {
        let Some(source) = self.vitals.get(attacker).map(|v| v.position) else {
            return false;
        };
        let Some(victim) = self.vitals.get(target).copied() else {
            return false;
        };
        if !victim.is_alive() {
            return false;
        }

        let attacker_angle = heading(source - victim.position);
        let (damage, negated) = match self.defenses.get_mut(target) {
            Some(defense) => {
                self.defense
                    .process_incoming_damage(defense, raw_damage, attacker_angle, victim.facing)
            },
            None => (raw_damage, false),
        };
        if negated {
            events.push(CombatEvent::Negated { attacker, target });
            return false;
        }

        let result = self.resolver.resolve(
            &DamageEvent::new(victim.health, victim.armor, damage).between(victim.position, source),
        );
        let Some(vitals) = self.vitals.get_mut(target) else {
            return false;
        };
        vitals.health -= result.health_damage;
        vitals.armor = (vitals.armor - result.armor_damage).max(0.0);
        vitals.velocity += result.knockback(self.config.knockback_force * knockback);
        let final_health = vitals.health;

        events.push(CombatEvent::Hit {
            attacker,
            target,
            health_damage: result.health_damage,
            armor_damage: result.armor_damage,
        });

        if let Some(combo) = self.combos.get_mut(target) {
            if self.combo.break_combo(combo) {
                events.push(CombatEvent::Combo {
                    entity: target,
                    event: ComboEvent::Broken {
                        reached: combo.step() + 1,
                    },
                });
            }
        }

        if result.killed {
            info!(%attacker, %target, final_health, "killed");
            events.push(CombatEvent::Killed { attacker, target });
            if let Some(telegraph) = self.telegraphs.get_mut(target) {
                telegraph.reset();
            }
            if self.resolver.should_gib(final_health) {
                events.push(CombatEvent::Gibbed { target });
            }
        }
        true
    }
}
