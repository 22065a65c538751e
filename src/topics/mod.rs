//! Topic classification

mod classifier;

pub use classifier::{TopicClassifier, DEFAULT_TOPIC, MIN_TOPIC_SCORE};
