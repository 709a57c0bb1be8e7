#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Up,
    Down,
    Left,
    Right,
    /// Space: talk, advance dialogue, pick a menu entry.
    Select,
    /// Return: open menus, confirm on title screens.
    Confirm,
    Quit,
}

const ACTION_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    fn any_down(&self) -> bool {
        self.down.iter().any(|down| *down)
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::Up => 0,
            InputAction::Down => 1,
            InputAction::Left => 2,
            InputAction::Right => 3,
            InputAction::Select => 4,
            InputAction::Confirm => 5,
            InputAction::Quit => 6,
        }
    }
}

/// A keydown or keyup for a mapped key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: InputAction,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn pressed(action: InputAction) -> Self {
        Self {
            action,
            pressed: true,
        }
    }

    pub fn released(action: InputAction) -> Self {
        Self {
            action,
            pressed: false,
        }
    }
}

/// Held keys plus the key transitions since the previous tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    key_events: Vec<KeyEvent>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, actions: ActionStates, key_events: Vec<KeyEvent>) -> Self {
        Self {
            quit_requested,
            actions,
            key_events,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn any_down(&self) -> bool {
        self.actions.any_down()
    }

    pub fn key_events(&self) -> &[KeyEvent] {
        &self.key_events
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_key_event(mut self, event: KeyEvent) -> Self {
        self.actions.set(event.action, event.pressed);
        self.key_events.push(event);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_updates_held_state() {
        let snapshot = InputSnapshot::empty()
            .with_key_event(KeyEvent::pressed(InputAction::Left))
            .with_key_event(KeyEvent::pressed(InputAction::Select))
            .with_key_event(KeyEvent::released(InputAction::Select));

        assert!(snapshot.is_down(InputAction::Left));
        assert!(!snapshot.is_down(InputAction::Select));
        assert_eq!(snapshot.key_events().len(), 3);
        assert!(snapshot.any_down());
        assert!(!InputSnapshot::empty().any_down());
    }
}
