use super::errors::CoordinatorError;
use super::models::{AccountName, Role, RoleSlot, RoleSpec};

/// Seats of one lobby, in variant order. A player holds at most one seat.
#[derive(Debug, Clone)]
pub struct RoleRoster {
    slots: Vec<(RoleSlot, Option<AccountName>)>,
}

impl RoleRoster {
    pub fn new(roles: &[RoleSpec]) -> Self {
        let slots = roles
            .iter()
            .flat_map(|spec| {
                (0..spec.slots).map(move |seat| (RoleSlot::new(spec.name.clone(), seat), None))
            })
            .collect();

        Self { slots }
    }

    /// Seats the player in the first vacant seat of `role`
    pub fn assign(&mut self, role: &Role, player: AccountName) -> Result<RoleSlot, CoordinatorError> {
        if !self.slots.iter().any(|(slot, _)| &slot.role == role) {
            return Err(CoordinatorError::UnknownRole(role.clone()));
        }

        if let Some(held) = self.slot_of(&player) {
            return Err(CoordinatorError::AlreadySeated(held.role.clone()));
        }

        let (slot, occupant) = self
            .slots
            .iter_mut()
            .find(|(slot, occupant)| &slot.role == role && occupant.is_none())
            .ok_or_else(|| CoordinatorError::RoleOccupied(role.clone()))?;

        *occupant = Some(player);
        Ok(slot.clone())
    }

    /// Empties a seat and returns who held it
    pub fn vacate(&mut self, slot: &RoleSlot) -> Option<AccountName> {
        self.slots
            .iter_mut()
            .find(|(s, _)| s == slot)
            .and_then(|(_, occupant)| occupant.take())
    }

    pub fn vacate_by_player(&mut self, player: &AccountName) -> Option<RoleSlot> {
        let (slot, occupant) = self
            .slots
            .iter_mut()
            .find(|(_, occupant)| occupant.as_ref() == Some(player))?;

        *occupant = None;
        Some(slot.clone())
    }

    pub fn occupant_of(&self, slot: &RoleSlot) -> Option<&AccountName> {
        self.slots
            .iter()
            .find(|(s, _)| s == slot)
            .and_then(|(_, occupant)| occupant.as_ref())
    }

    /// Everyone seated in any seat of `role`
    pub fn occupants_of(&self, role: &Role) -> Vec<&AccountName> {
        self.slots
            .iter()
            .filter(|(slot, _)| &slot.role == role)
            .filter_map(|(_, occupant)| occupant.as_ref())
            .collect()
    }

    pub fn slot_of(&self, player: &AccountName) -> Option<&RoleSlot> {
        self.slots
            .iter()
            .find(|(_, occupant)| occupant.as_ref() == Some(player))
            .map(|(slot, _)| slot)
    }

    pub fn is_seated(&self, player: &AccountName) -> bool {
        self.slot_of(player).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|(_, occupant)| occupant.is_some())
    }

    pub fn seated_players(&self) -> Vec<&AccountName> {
        self.slots
            .iter()
            .filter_map(|(_, occupant)| occupant.as_ref())
            .collect()
    }

    pub fn seated_count(&self) -> usize {
        self.slots.iter().filter(|(_, o)| o.is_some()).count()
    }

    pub fn slots(&self) -> &[(RoleSlot, Option<AccountName>)] {
        &self.slots
    }
}
