use ratatui::layout::Rect;

use crate::conversation::{Controller, Notice, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// The two call-to-action buttons on the landing page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LandingButton {
    #[default]
    StartLearning,
    StartJourney,
}

impl LandingButton {
    pub fn label(&self) -> &'static str {
        match self {
            LandingButton::StartLearning => "Start Learning",
            LandingButton::StartJourney => "Start Your Journey",
        }
    }

    pub fn trigger(&self) -> Trigger {
        match self {
            LandingButton::StartLearning => Trigger::StartLearning,
            LandingButton::StartJourney => Trigger::StartJourney,
        }
    }

    fn toggled(&self) -> Self {
        match self {
            LandingButton::StartLearning => LandingButton::StartJourney,
            LandingButton::StartJourney => LandingButton::StartLearning,
        }
    }
}

/// Named interaction points of the interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    StartLearning,
    StartJourney,
    BackToLanding,
    Submit,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub conversation: Controller,
    pub api_url: String,

    // Landing page
    pub landing_selection: LandingButton,

    // Chat log scrolling
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16, // Inner height of the log, set during render
    pub chat_width: u16,  // Inner width of the log, set during render

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub start_learning_area: Option<Rect>,
    pub start_journey_area: Option<Rect>,
    pub chat_area: Option<Rect>,
    pub input_area: Option<Rect>,
    pub back_area: Option<Rect>,
}

impl App {
    pub fn new(conversation: Controller, api_url: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            conversation,
            api_url,

            landing_selection: LandingButton::default(),

            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            start_learning_area: None,
            start_journey_area: None,
            chat_area: None,
            input_area: None,
            back_area: None,
        }
    }

    pub fn view(&self) -> View {
        self.conversation.current_view()
    }

    pub fn activate(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::StartLearning | Trigger::StartJourney => {
                self.conversation.navigate_to_chat();
                self.follow_tail = true;
            }
            Trigger::BackToLanding => {
                self.input_mode = InputMode::Normal;
                self.conversation.navigate_to_landing();
            }
            Trigger::Submit => {
                if self.conversation.submit_input().is_some() {
                    self.follow_tail = true;
                }
            }
        }
    }

    pub fn on_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Reply(reply) => {
                self.conversation.apply_reply(reply);
                self.follow_tail = true;
            }
            Notice::FocusInput => {
                // The user may have gone back before the delay elapsed
                if self.view() == View::Chat {
                    self.focus_input();
                }
            }
        }
    }

    pub fn focus_input(&mut self) {
        self.input_mode = InputMode::Editing;
        self.conversation.input_mut().move_end();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn toggle_landing_selection(&mut self) {
        self.landing_selection = self.landing_selection.toggled();
    }

    /// Number of terminal rows the log occupies at the current width.
    pub fn chat_line_count(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let rows = crate::ui::chat_log(&self.conversation).line_count(wrap_width);
        rows.min(u16::MAX as usize) as u16
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.chat_line_count().saturating_sub(visible_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll == max;
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_tail = true;
    }
}
