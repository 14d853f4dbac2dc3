use serde::Serialize;
use std::collections::VecDeque;
use tracing::{
    error,
    info,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Toast side-channel. Keeps the most recent `capacity` notices; older ones
/// fall off the front.
#[derive(Clone, Debug)]
pub struct Notifications {
    items: VecDeque<Notice>,
    capacity: usize,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Notifications {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => error!("{}", message),
            NoticeLevel::Info | NoticeLevel::Success => info!("{}", message),
        }
        self.items.push_back(Notice { level, message });
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count_matching(&self, message: &str) -> usize {
        self.items.iter().filter(|n| n.message == message).count()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.items.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn push__drops_oldest_past_capacity() {
        // given
        let mut notices = Notifications::new(2);

        // when
        notices.info("one");
        notices.error("two");
        notices.success("three");

        // then
        let messages: Vec<_> = notices.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn drain__empties_the_queue() {
        let mut notices = Notifications::default();
        notices.error("boom");
        let drained = notices.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].level, NoticeLevel::Error);
        assert!(notices.is_empty());
    }
}
