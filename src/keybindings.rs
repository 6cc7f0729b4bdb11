//! Keybinding registry: maps actions to key events with config overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    CycleFocus,
    Back,
    Select,
    Refresh,
    EnterSearch,
    ExitSearch,
    CommitSearch,
    LoadMore,
    OpenInBrowser,
    HistoryBack,
    NewCategory,
    NewFeed,
    Edit,
    Delete,
    MoveUp,
    MoveDown,
    EditUser,
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    ShowHelp,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NavDown => "Navigate down",
            Self::NavUp => "Navigate up",
            Self::CycleFocus => "Cycle panel focus",
            Self::Back => "Go back / dismiss",
            Self::Select => "Select / open",
            Self::Refresh => "Reload categories",
            Self::EnterSearch => "Search entries",
            Self::ExitSearch => "Cancel search input",
            Self::CommitSearch => "Run search",
            Self::LoadMore => "Load more entries",
            Self::OpenInBrowser => "Open entry link in browser",
            Self::HistoryBack => "Previous location",
            Self::NewCategory => "New category",
            Self::NewFeed => "Subscribe to feed",
            Self::Edit => "Edit category or feed",
            Self::Delete => "Delete category or feed",
            Self::MoveUp => "Move category up",
            Self::MoveDown => "Move category down",
            Self::EditUser => "Edit account",
            Self::ScrollDown => "Scroll down one line",
            Self::ScrollUp => "Scroll up one line",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::ShowHelp => "Show help",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Sidebar,
    EntryList,
    Reader,
    Search,
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Accepts a single character (`"q"`, `"/"`), a named key (`"Enter"`,
/// `"Backspace"`, `"Space"`, case-insensitive), `"Ctrl+<char>"`, or `"F1"`
/// through `"F12"`.
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+").or_else(|| s.strip_prefix("ctrl+")) {
        let mut chars = rest.trim().chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeySpec::ctrl(c)),
            _ => None,
        };
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "backspace" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<u8>().ok())
    {
        return (1..=12).contains(&n).then(|| KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeySpec::char(c)),
        _ => None,
    }
}

/// Format a KeySpec for the help screen and status hints.
pub fn format_key(key: &KeySpec) -> String {
    let name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Del".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        format!("Ctrl+{}", name)
    } else {
        name
    }
}

// ============================================================================
// Default Bindings
// ============================================================================

const DEFAULT_BINDINGS: &[(Context, KeySpec, Action)] = &[
    (Context::Global, KeySpec::char('q'), Action::Quit),
    (Context::Global, KeySpec::char('j'), Action::NavDown),
    (Context::Global, KeySpec::plain(KeyCode::Down), Action::NavDown),
    (Context::Global, KeySpec::char('k'), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Up), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Tab), Action::CycleFocus),
    (Context::Global, KeySpec::plain(KeyCode::Esc), Action::Back),
    (Context::Global, KeySpec::plain(KeyCode::Enter), Action::Select),
    (Context::Global, KeySpec::char('r'), Action::Refresh),
    (Context::Global, KeySpec::char('/'), Action::EnterSearch),
    (Context::Global, KeySpec::char('o'), Action::OpenInBrowser),
    (Context::Global, KeySpec::plain(KeyCode::Backspace), Action::HistoryBack),
    (Context::Global, KeySpec::char('c'), Action::NewCategory),
    (Context::Global, KeySpec::char('a'), Action::NewFeed),
    (Context::Global, KeySpec::char('U'), Action::EditUser),
    (Context::Global, KeySpec::char('?'), Action::ShowHelp),
    (Context::Sidebar, KeySpec::char('e'), Action::Edit),
    (Context::Sidebar, KeySpec::char('d'), Action::Delete),
    (Context::Sidebar, KeySpec::char('K'), Action::MoveUp),
    (Context::Sidebar, KeySpec::char('J'), Action::MoveDown),
    (Context::EntryList, KeySpec::char('m'), Action::LoadMore),
    (Context::Reader, KeySpec::char('j'), Action::ScrollDown),
    (Context::Reader, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::Reader, KeySpec::char('k'), Action::ScrollUp),
    (Context::Reader, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::Reader, KeySpec::ctrl('d'), Action::PageDown),
    (Context::Reader, KeySpec::ctrl('u'), Action::PageUp),
    (Context::Search, KeySpec::plain(KeyCode::Esc), Action::ExitSearch),
    (Context::Search, KeySpec::plain(KeyCode::Enter), Action::CommitSearch),
];

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts; a
/// lookup that misses its own context falls back to Global.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings, in registration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::with_capacity(DEFAULT_BINDINGS.len()),
        };
        for &(context, key, action) in DEFAULT_BINDINGS {
            registry.bind(context, key, action);
        }
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    /// Apply user overrides from the config `[keybindings]` table.
    ///
    /// Keys are action names (`"quit"`, `"load_more"`), values are key
    /// strings (`"q"`, `"Ctrl+d"`, `"F5"`). The new key replaces every
    /// default binding of the action, in the same contexts. Returns a
    /// warning per entry that could not be applied.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        // Sorted so overrides that collide resolve the same way every run.
        let mut entries: Vec<_> = overrides.iter().collect();
        entries.sort();

        for (action_name, key_str) in entries {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);
            for context in contexts {
                self.bind(context, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Look up the action for a key, trying `context` before Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers);
        self.lookup
            .get(&(context, key))
            .or_else(|| self.lookup.get(&(Context::Global, key)))
            .copied()
    }

    /// First key bound to `action`, formatted, for status-bar hints.
    pub fn key_for(&self, action: Action) -> Option<String> {
        self.bindings
            .iter()
            .find(|(_, _, a)| *a == action)
            .map(|(_, key, _)| format_key(key))
    }

    /// (context, key, action, description) for every binding.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name from config. Underscores are optional.
fn parse_action_name(name: &str) -> Option<Action> {
    let normalized = name.to_lowercase().replace('_', "");
    let action = match normalized.as_str() {
        "quit" => Action::Quit,
        "navdown" | "down" => Action::NavDown,
        "navup" | "up" => Action::NavUp,
        "cyclefocus" | "tab" => Action::CycleFocus,
        "back" => Action::Back,
        "select" | "enter" => Action::Select,
        "refresh" | "reload" => Action::Refresh,
        "entersearch" | "search" => Action::EnterSearch,
        "exitsearch" => Action::ExitSearch,
        "commitsearch" => Action::CommitSearch,
        "loadmore" | "more" => Action::LoadMore,
        "openinbrowser" | "open" => Action::OpenInBrowser,
        "historyback" | "history" => Action::HistoryBack,
        "newcategory" => Action::NewCategory,
        "newfeed" | "subscribe" => Action::NewFeed,
        "edit" => Action::Edit,
        "delete" => Action::Delete,
        "moveup" => Action::MoveUp,
        "movedown" => Action::MoveDown,
        "edituser" | "account" => Action::EditUser,
        "scrolldown" => Action::ScrollDown,
        "scrollup" => Action::ScrollUp,
        "pagedown" => Action::PageDown,
        "pageup" => Action::PageUp,
        "showhelp" | "help" => Action::ShowHelp,
        _ => return None,
    };
    Some(action)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(reg: &KeybindingRegistry, c: char, context: Context) -> Option<Action> {
        reg.action_for_key(KeyCode::Char(c), KeyModifiers::NONE, context)
    }

    #[test]
    fn test_default_global_keys() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, 'q', Context::Global), Some(Action::Quit));
        assert_eq!(key(&reg, 'j', Context::Global), Some(Action::NavDown));
        assert_eq!(key(&reg, '/', Context::Global), Some(Action::EnterSearch));
        assert_eq!(
            reg.action_for_key(KeyCode::Backspace, KeyModifiers::NONE, Context::Global),
            Some(Action::HistoryBack)
        );
    }

    #[test]
    fn test_sidebar_keys_do_not_leak_into_entries() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, 'd', Context::Sidebar), Some(Action::Delete));
        assert_eq!(key(&reg, 'J', Context::Sidebar), Some(Action::MoveDown));
        assert_eq!(key(&reg, 'd', Context::EntryList), None);
        assert_eq!(key(&reg, 'm', Context::EntryList), Some(Action::LoadMore));
        assert_eq!(key(&reg, 'm', Context::Sidebar), None);
    }

    #[test]
    fn test_reader_context_overrides_global() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, 'j', Context::Reader), Some(Action::ScrollDown));
        // Falls back to Global for keys the reader does not bind.
        assert_eq!(key(&reg, 'q', Context::Reader), Some(Action::Quit));
        assert_eq!(key(&reg, 'o', Context::Reader), Some(Action::OpenInBrowser));
        assert_eq!(
            reg.action_for_key(KeyCode::Char('d'), KeyModifiers::CONTROL, Context::Reader),
            Some(Action::PageDown)
        );
    }

    #[test]
    fn test_search_context() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            reg.action_for_key(KeyCode::Esc, KeyModifiers::NONE, Context::Search),
            Some(Action::ExitSearch)
        );
        assert_eq!(
            reg.action_for_key(KeyCode::Enter, KeyModifiers::NONE, Context::Search),
            Some(Action::CommitSearch)
        );
    }

    #[test]
    fn test_unknown_key_returns_none() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            reg.action_for_key(KeyCode::F(12), KeyModifiers::NONE, Context::Global),
            None
        );
    }

    #[test]
    fn test_apply_overrides_valid() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("quit".to_string(), "Ctrl+q".to_string())]);

        assert!(reg.apply_overrides(&overrides).is_empty());
        assert_eq!(key(&reg, 'q', Context::Global), None);
        assert_eq!(
            reg.action_for_key(KeyCode::Char('q'), KeyModifiers::CONTROL, Context::Global),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_override_keeps_context() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("load_more".to_string(), "n".to_string())]);

        assert!(reg.apply_overrides(&overrides).is_empty());
        assert_eq!(key(&reg, 'n', Context::EntryList), Some(Action::LoadMore));
        assert_eq!(key(&reg, 'n', Context::Sidebar), None);
        assert_eq!(key(&reg, 'm', Context::EntryList), None);
    }

    #[test]
    fn test_override_replaces_all_keys_of_action() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("nav_down".to_string(), "n".to_string())]);
        reg.apply_overrides(&overrides);

        assert_eq!(key(&reg, 'n', Context::Global), Some(Action::NavDown));
        assert_eq!(
            reg.action_for_key(KeyCode::Down, KeyModifiers::NONE, Context::Global),
            None
        );
        assert_eq!(
            reg.all_bindings()
                .iter()
                .filter(|(_, _, a, _)| *a == Action::NavDown)
                .count(),
            1
        );
    }

    #[test]
    fn test_apply_overrides_warnings() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([
            ("nonexistent_action".to_string(), "q".to_string()),
            ("quit".to_string(), "Ctrl+Alt+Q".to_string()),
        ]);

        let warnings = reg.apply_overrides(&overrides);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("Unknown action")));
        assert!(warnings.iter().any(|w| w.contains("Cannot parse key")));
        // Failed override leaves the default in place.
        assert_eq!(key(&reg, 'q', Context::Global), Some(Action::Quit));
    }

    #[test]
    fn test_parse_key_string() {
        assert_eq!(parse_key_string("Enter"), Some(KeySpec::plain(KeyCode::Enter)));
        assert_eq!(parse_key_string("esc"), Some(KeySpec::plain(KeyCode::Esc)));
        assert_eq!(parse_key_string("space"), Some(KeySpec::char(' ')));
        assert_eq!(parse_key_string("F5"), Some(KeySpec::plain(KeyCode::F(5))));
        assert_eq!(parse_key_string("F13"), None);
        assert_eq!(parse_key_string("Ctrl+u"), Some(KeySpec::ctrl('u')));
        assert_eq!(parse_key_string("/"), Some(KeySpec::char('/')));
        assert_eq!(parse_key_string("F"), Some(KeySpec::char('F')));
        assert_eq!(parse_key_string("qq"), None);
    }

    #[test]
    fn test_parse_action_name_aliases() {
        assert_eq!(parse_action_name("load_more"), Some(Action::LoadMore));
        assert_eq!(parse_action_name("LoadMore"), Some(Action::LoadMore));
        assert_eq!(parse_action_name("history_back"), Some(Action::HistoryBack));
        assert_eq!(parse_action_name("star"), None);
    }

    #[test]
    fn test_format_key_display() {
        assert_eq!(format_key(&KeySpec::char('q')), "q");
        assert_eq!(format_key(&KeySpec::ctrl('d')), "Ctrl+d");
        assert_eq!(format_key(&KeySpec::plain(KeyCode::Backspace)), "Backspace");
        assert_eq!(format_key(&KeySpec::char(' ')), "Space");
    }

    #[test]
    fn test_key_for_hint() {
        let reg = KeybindingRegistry::new();
        assert_eq!(reg.key_for(Action::ShowHelp).as_deref(), Some("?"));
        assert_eq!(reg.key_for(Action::NavDown).as_deref(), Some("j"));
    }

    #[test]
    fn test_every_action_has_a_default_binding() {
        let reg = KeybindingRegistry::new();
        let bound: std::collections::HashSet<Action> =
            reg.all_bindings().into_iter().map(|(_, _, a, _)| a).collect();
        assert_eq!(bound.len(), 25);
    }
}
