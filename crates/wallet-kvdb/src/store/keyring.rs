// Copyright (C) 2023 Entropy Cryptography Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The cipher units attached to a store.
use crate::cipher::{self, CipherUnit, Password};

#[derive(Debug, Default)]
pub(super) struct Keyring {
    units: Vec<CipherUnit>,
    /// Position of the unit used for new writes. Always an armed unit.
    active: Option<usize>,
}

impl Keyring {
    pub(super) fn new(units: Vec<CipherUnit>) -> Self {
        Self { units, active: None }
    }

    pub(super) fn units(&self) -> &[CipherUnit] {
        &self.units
    }

    /// A store with at least one master key is encrypted, whether or not it is unlocked.
    pub(super) fn is_encrypted(&self) -> bool {
        !self.units.is_empty()
    }

    pub(super) fn active(&self) -> Option<&CipherUnit> {
        self.active.and_then(|position| self.units.get(position)).filter(|unit| unit.is_armed())
    }

    /// Every armed unit, the active one first.
    pub(super) fn armed(&self) -> Vec<&CipherUnit> {
        let mut armed: Vec<&CipherUnit> = self.active().into_iter().collect();
        armed.extend(
            self.units
                .iter()
                .enumerate()
                .filter(|(position, unit)| Some(*position) != self.active && unit.is_armed())
                .map(|(_, unit)| unit),
        );
        armed
    }

    /// Adds a unit. An armed unit becomes the active one.
    pub(super) fn add(&mut self, unit: CipherUnit) {
        let armed = unit.is_armed();
        self.units.push(unit);
        if armed {
            self.active = Some(self.units.len() - 1);
        }
    }

    /// Checks `password` and arms every locked unit it opens, the last of which becomes active.
    ///
    /// Armed units are only tried when no locked unit opened, and only until one accepts, since
    /// every try runs the full key derivation.
    pub(super) fn unlock(&mut self, password: &Password) -> cipher::Result<bool> {
        if let Some(&position) = self.arm_locked(password)?.last() {
            self.active = Some(position);
            return Ok(true);
        }
        for (position, unit) in self.units.iter().enumerate() {
            if unit.is_armed() && unit.accepts(password)? {
                self.active = Some(position);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Positions of every unit `password` opens, arming the locked ones. The last of them becomes
    /// active.
    pub(super) fn opened_by(&mut self, password: &Password) -> cipher::Result<Vec<usize>> {
        let mut opened = self.arm_locked(password)?;
        for (position, unit) in self.units.iter().enumerate() {
            if unit.is_armed() && !opened.contains(&position) && unit.accepts(password)? {
                opened.push(position);
            }
        }
        opened.sort_unstable();
        if let Some(&position) = opened.last() {
            self.active = Some(position);
        }
        Ok(opened)
    }

    fn arm_locked(&mut self, password: &Password) -> cipher::Result<Vec<usize>> {
        let mut opened = Vec::new();
        for (position, unit) in self.units.iter_mut().enumerate() {
            if unit.is_armed() {
                continue;
            }
            unit.unlock(password)?;
            match unit.arm() {
                Ok(()) => opened.push(position),
                Err(cipher::Error::AuthenticationFailed) => {},
                Err(err) => return Err(err),
            }
        }
        Ok(opened)
    }

    /// Locks every unit, wiping all key material.
    pub(super) fn lock(&mut self) {
        for unit in self.units.iter_mut() {
            unit.lock();
        }
        self.active = None;
    }

    /// Drops the units at `positions`. The active unit is reset if it was among them.
    pub(super) fn remove(&mut self, positions: &[usize]) {
        let active = self.active.filter(|position| !positions.contains(position));
        let active_unit = active.map(|position| self.units[position].wrapped().clone());
        let mut position = 0;
        self.units.retain(|_| {
            let keep = !positions.contains(&position);
            position += 1;
            keep
        });
        self.active = active_unit.and_then(|wrapped| {
            self.units.iter().position(|unit| *unit.wrapped() == wrapped)
        });
    }

    /// Drops every unit.
    pub(super) fn clear(&mut self) {
        self.units.clear();
        self.active = None;
    }
}
