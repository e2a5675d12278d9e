//! Key and modifier definitions
//!
//! Platform backends translate their native key codes into [`Key`] and
//! their modifier flags into [`Modifiers`], so matching never sees raw
//! OS values.

use std::fmt;

/// Modifier flag masks from macOS CGEventFlags
#[cfg(target_os = "macos")]
pub mod flags {
    use core_graphics::event::CGEventFlags;

    /// Control key modifier flag
    pub const CONTROL: CGEventFlags = CGEventFlags::CGEventFlagControl;
    /// Option/Alt key modifier flag
    pub const OPTION: CGEventFlags = CGEventFlags::CGEventFlagAlternate;
    /// Shift key modifier flag
    pub const SHIFT: CGEventFlags = CGEventFlags::CGEventFlagShift;
    /// Command key modifier flag
    pub const COMMAND: CGEventFlags = CGEventFlags::CGEventFlagCommand;
}

/// The set of modifier keys held at the time of a key event
///
/// Comparison is by set membership, so the order in which modifiers were
/// pressed or written in a hotkey string does not matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Control key is held
    pub control: bool,
    /// Alt/Option key is held
    pub alt: bool,
    /// Shift key is held
    pub shift: bool,
    /// Windows/Command/Super key is held
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        control: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Create a Modifiers set from CGEventFlags
    #[cfg(target_os = "macos")]
    pub fn from_flags(event_flags: core_graphics::event::CGEventFlags) -> Self {
        Self {
            control: event_flags.contains(flags::CONTROL),
            alt: event_flags.contains(flags::OPTION),
            shift: event_flags.contains(flags::SHIFT),
            meta: event_flags.contains(flags::COMMAND),
        }
    }

    /// Check if no modifier is held
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Set the flag for a single modifier
    pub fn set(&mut self, modifier: Modifier, held: bool) {
        match modifier {
            Modifier::Control => self.control = held,
            Modifier::Alt => self.alt = held,
            Modifier::Shift => self.shift = held,
            Modifier::Meta => self.meta = held,
        }
    }

    /// Return a copy with the given modifier added
    pub fn with(mut self, modifier: Modifier) -> Self {
        self.set(modifier, true);
        self
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (held, name) in [
            (self.control, "ctrl"),
            (self.alt, "alt"),
            (self.shift, "shift"),
            (self.meta, "win"),
        ] {
            if held {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A single modifier key, independent of left/right side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Control,
    Alt,
    Shift,
    Meta,
}

impl Modifier {
    /// Parse a modifier name as written in a hotkey string
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ctrl" | "control" => Some(Modifier::Control),
            "alt" | "option" | "opt" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            "win" | "windows" | "cmd" | "command" | "super" | "meta" => Some(Modifier::Meta),
            _ => None,
        }
    }
}

/// A primary (non-modifier) key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A letter or digit, stored lowercase
    Char(char),
    PrintScreen,
    Escape,
    /// Function key F1..F24
    F(u8),
    /// A modifier key on its own; never a valid primary key
    Modifier(Modifier),
    /// Any key this crate has no name for, carrying the native code
    Other(u32),
}

impl Key {
    /// Parse a key name as written in a hotkey string
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "print screen" | "printscreen" | "print" | "prtsc" | "prtscr" => {
                return Some(Key::PrintScreen)
            }
            "escape" | "esc" => return Some(Key::Escape),
            _ => {}
        }

        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                return Some(Key::Char(c.to_ascii_lowercase()));
            }
        }

        name.strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=24).contains(n))
            .map(Key::F)
    }

    /// Translate a macOS virtual key code (ANSI layout)
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub fn from_mac_keycode(code: u16) -> Self {
        let c = match code {
            0 => 'a',
            1 => 's',
            2 => 'd',
            3 => 'f',
            4 => 'h',
            5 => 'g',
            6 => 'z',
            7 => 'x',
            8 => 'c',
            9 => 'v',
            11 => 'b',
            12 => 'q',
            13 => 'w',
            14 => 'e',
            15 => 'r',
            16 => 'y',
            17 => 't',
            18 => '1',
            19 => '2',
            20 => '3',
            21 => '4',
            22 => '6',
            23 => '5',
            25 => '9',
            26 => '7',
            28 => '8',
            29 => '0',
            31 => 'o',
            32 => 'u',
            34 => 'i',
            35 => 'p',
            37 => 'l',
            38 => 'j',
            40 => 'k',
            45 => 'n',
            46 => 'm',
            53 => return Key::Escape,
            // Apple keyboards put F13 where PC keyboards have Print Screen
            105 => return Key::PrintScreen,
            122 => return Key::F(1),
            120 => return Key::F(2),
            99 => return Key::F(3),
            118 => return Key::F(4),
            96 => return Key::F(5),
            97 => return Key::F(6),
            98 => return Key::F(7),
            100 => return Key::F(8),
            101 => return Key::F(9),
            109 => return Key::F(10),
            103 => return Key::F(11),
            111 => return Key::F(12),
            54 | 55 => return Key::Modifier(Modifier::Meta),
            56 | 60 => return Key::Modifier(Modifier::Shift),
            58 | 61 => return Key::Modifier(Modifier::Alt),
            59 | 62 => return Key::Modifier(Modifier::Control),
            other => return Key::Other(other as u32),
        };
        Key::Char(c)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::PrintScreen => f.write_str("print screen"),
            Key::Escape => f.write_str("esc"),
            Key::F(n) => write!(f, "f{}", n),
            Key::Modifier(m) => write!(f, "{:?}", m),
            Key::Other(code) => write!(f, "key#{}", code),
        }
    }
}
