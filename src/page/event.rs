use crate::dom::NodeId;
use crate::types::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Click,
    DblClick,
    ContextMenu,
    MouseDown,
    MouseUp,
    MouseOver,
    MouseOut,
    Wheel,
    TouchStart,
    Input,
    Change,
    Submit,
    KeyDown,
    KeyUp,
    Scroll,
    Resize,
    DragStart,
    Drag,
    DragEnter,
    DragOver,
    DragLeave,
    Drop,
    DragEnd,
    PopState,
    HashChange,
    BeforeUnload,
    Unload,
    PageHide,
    VisibilityChange,
    Focus,
    Blur,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::DblClick => "dblclick",
            EventKind::ContextMenu => "contextmenu",
            EventKind::MouseDown => "mousedown",
            EventKind::MouseUp => "mouseup",
            EventKind::MouseOver => "mouseover",
            EventKind::MouseOut => "mouseout",
            EventKind::Wheel => "wheel",
            EventKind::TouchStart => "touchstart",
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::Submit => "submit",
            EventKind::KeyDown => "keydown",
            EventKind::KeyUp => "keyup",
            EventKind::Scroll => "scroll",
            EventKind::Resize => "resize",
            EventKind::DragStart => "dragstart",
            EventKind::Drag => "drag",
            EventKind::DragEnter => "dragenter",
            EventKind::DragOver => "dragover",
            EventKind::DragLeave => "dragleave",
            EventKind::Drop => "drop",
            EventKind::DragEnd => "dragend",
            EventKind::PopState => "popstate",
            EventKind::HashChange => "hashchange",
            EventKind::BeforeUnload => "beforeunload",
            EventKind::Unload => "unload",
            EventKind::PageHide => "pagehide",
            EventKind::VisibilityChange => "visibilitychange",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
        }
    }

    pub fn is_click_family(&self) -> bool {
        matches!(
            self,
            EventKind::Click | EventKind::DblClick | EventKind::ContextMenu
        )
    }

    pub fn is_drag_family(&self) -> bool {
        matches!(
            self,
            EventKind::DragStart
                | EventKind::Drag
                | EventKind::DragEnter
                | EventKind::DragOver
                | EventKind::DragLeave
                | EventKind::Drop
                | EventKind::DragEnd
        )
    }

    pub fn is_unload(&self) -> bool {
        matches!(
            self,
            EventKind::BeforeUnload | EventKind::Unload | EventKind::PageHide
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any_chord(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// A DOM event as seen by a capture-phase listener.
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    pub is_trusted: bool,
    pub client: Option<Point>,
    pub screen: Point,
    pub detail: i64,
    pub button: i16,
    pub key: String,
    pub code: String,
    pub modifiers: Modifiers,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            is_trusted: true,
            client: None,
            screen: Point::default(),
            detail: 0,
            button: 0,
            key: String::new(),
            code: String::new(),
            modifiers: Modifiers::default(),
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    /// Pointer event with the shape a real user click has: non-zero screen
    /// coordinates and `detail` carrying the click count.
    pub fn pointer(kind: EventKind, target: NodeId, x: f64, y: f64) -> Self {
        let mut event = Self::new(kind, target);
        event.client = Some(Point::new(x, y));
        event.screen = Point::new(x, y);
        event.detail = if kind == EventKind::DblClick { 2 } else { 1 };
        if kind == EventKind::ContextMenu {
            event.button = 2;
        }
        event
    }

    pub fn key(kind: EventKind, target: NodeId, key: &str, code: &str) -> Self {
        let mut event = Self::new(kind, target);
        event.key = key.to_string();
        event.code = code.to_string();
        event
    }

    pub fn untrusted(mut self) -> Self {
        self.is_trusted = false;
        self
    }

    pub fn with_screen(mut self, x: f64, y: f64) -> Self {
        self.screen = Point::new(x, y);
        self
    }

    pub fn with_client(mut self, x: f64, y: f64) -> Self {
        self.client = Some(Point::new(x, y));
        self
    }

    pub fn with_detail(mut self, detail: i64) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// `element.click()` and `dispatchEvent(new MouseEvent('click'))` leave
    /// screen coordinates and click count at zero.
    pub fn has_synthetic_click_signature(&self) -> bool {
        self.screen.x == 0.0 && self.screen.y == 0.0 && self.detail == 0
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// preventDefault + stopPropagation + stopImmediatePropagation.
    pub fn block(&mut self) {
        self.prevent_default();
        self.stop_immediate_propagation();
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}
