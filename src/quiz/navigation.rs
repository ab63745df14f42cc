use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Coarse application phases. The UI renders whatever the navigator says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Setup,
    GeneratingQuiz,
    Playing,
    ShowAnswer,
    SummarizingResults,
    Results,
    ChattingQuestion,
    CourseList,
    CourseDetail,
    QuizHistoryDetail,
}

impl GameState {
    pub fn can_go_to(self, to: GameState) -> bool {
        use GameState::*;
        if self == to {
            return true;
        }
        match to {
            Setup | CourseList | CourseDetail => true,
            GeneratingQuiz => matches!(self, Setup | CourseList | CourseDetail),
            Playing => !matches!(self, SummarizingResults),
            ShowAnswer => matches!(self, Playing | ChattingQuestion),
            SummarizingResults => matches!(self, Playing | ShowAnswer),
            Results => matches!(self, SummarizingResults | ChattingQuestion),
            ChattingQuestion => matches!(self, Playing | ShowAnswer | Results),
            QuizHistoryDetail => matches!(self, CourseDetail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    /// Something failed and the user has to act.
    Error(String),
    /// Informational; the flow goes on.
    Advisory(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub state: GameState,
    pub loading_message: String,
    pub banner: Option<Banner>,
}

/// Owns the current [`Screen`] and publishes every change to subscribers.
#[derive(Debug)]
pub struct Navigator {
    screen: watch::Sender<Screen>,
    /// Where a tutor chat returns to.
    previous: GameState,
}

impl Navigator {
    pub fn new(initial: GameState) -> Self {
        let (screen, _) = watch::channel(Screen {
            state: initial,
            loading_message: String::new(),
            banner: None,
        });
        Self {
            screen,
            previous: GameState::CourseList,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Screen> {
        self.screen.subscribe()
    }

    pub fn state(&self) -> GameState {
        self.screen.borrow().state
    }

    pub fn screen(&self) -> Screen {
        self.screen.borrow().clone()
    }

    pub fn go(&mut self, to: GameState) -> bool {
        let from = self.state();
        if !from.can_go_to(to) {
            log::warn!("Ignoring navigation from {from:?} to {to:?}");
            return false;
        }
        if from != to {
            log::debug!("Navigating from {from:?} to {to:?}");
            self.screen.send_modify(|s| s.state = to);
        }
        true
    }

    pub fn enter_chat(&mut self) -> bool {
        let from = self.state();
        if !from.can_go_to(GameState::ChattingQuestion) || from == GameState::ChattingQuestion {
            return false;
        }
        self.previous = from;
        self.go(GameState::ChattingQuestion)
    }

    pub fn leave_chat(&mut self) -> bool {
        if self.state() != GameState::ChattingQuestion {
            return false;
        }
        let back = self.previous;
        self.go(back)
    }

    pub fn set_loading(&self, message: impl Into<String>) {
        let message = message.into();
        self.screen.send_modify(|s| s.loading_message = message);
    }

    pub fn clear_loading(&self) {
        self.screen.send_modify(|s| s.loading_message.clear());
    }

    pub fn show_error(&self, message: impl Into<String>) {
        let banner = Banner::Error(message.into());
        self.screen.send_modify(|s| s.banner = Some(banner));
    }

    pub fn show_advisory(&self, message: impl Into<String>) {
        let banner = Banner::Advisory(message.into());
        self.screen.send_modify(|s| s.banner = Some(banner));
    }

    pub fn clear_banner(&self) {
        self.screen.send_modify(|s| s.banner = None);
    }
}
