// Click-wheel navigation state machine
// Holds which screen is showing and the home-menu cursor, and interprets the
// four wheel inputs against them. Track stepping is reported back to the caller,
// which owns the playlist and the player.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    NowPlaying,
    Playlist,
    Search,
    Settings,
}

// Home menu entries, top to bottom
pub const MENU_ITEMS: [(Screen, &str); 4] = [
    (Screen::NowPlaying, "Now Playing"),
    (Screen::Playlist, "Playlist"),
    (Screen::Search, "Search"),
    (Screen::Settings, "Settings"),
];

const LAST_MENU_INDEX: usize = MENU_ITEMS.len() - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelInput {
    Next,
    Prev,
    Menu,
    Center,
}

// What an input asks of the rest of the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Nothing,
    CursorMoved,
    ScreenChanged(Screen),
    StepTrack(Step),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    screen: Screen,
    menu_cursor: usize,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Navigator {
            screen: Screen::Menu,
            menu_cursor: 0,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn menu_cursor(&self) -> usize {
        self.menu_cursor
    }

    pub fn handle(&mut self, input: WheelInput) -> Transition {
        match (self.screen, input) {
            (Screen::Menu, WheelInput::Next) => {
                self.menu_cursor = (self.menu_cursor + 1).min(LAST_MENU_INDEX);
                Transition::CursorMoved
            }
            (Screen::Menu, WheelInput::Prev) => {
                self.menu_cursor = self.menu_cursor.saturating_sub(1);
                Transition::CursorMoved
            }
            (Screen::Menu, WheelInput::Menu) => Transition::Nothing,
            (Screen::Menu, WheelInput::Center) => {
                let (target, _) = MENU_ITEMS[self.menu_cursor.min(LAST_MENU_INDEX)];
                self.activate(target)
            }
            (_, WheelInput::Next) => Transition::StepTrack(Step::Forward),
            (_, WheelInput::Prev) => Transition::StepTrack(Step::Backward),
            (_, WheelInput::Menu) => self.activate(Screen::Menu),
            (_, WheelInput::Center) => Transition::Nothing,
        }
    }

    // Direct jump from a menu or list selection. The menu cursor stays put.
    pub fn activate(&mut self, screen: Screen) -> Transition {
        self.screen = screen;
        Transition::ScreenChanged(screen)
    }
}
