//! crates/coursegen_core/src/outline.rs
//!
//! Parsing of the `->` hierarchy used by generated lesson plans, and the
//! ordered list of note sections derived from it.

const LEVEL_SEPARATOR: &str = "->";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LessonPlanOutline {
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub title: String,
    pub subtopics: Vec<Subtopic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtopic {
    pub title: String,
    pub points: Vec<String>,
}

/// One unit of note generation: a topic, optionally narrowed to a subtopic and a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRef {
    pub topic: String,
    pub subtopic: Option<String>,
    pub point: Option<String>,
}

impl SectionRef {
    pub fn topic_only(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            subtopic: None,
            point: None,
        }
    }

    /// The most specific title of the section, used as its heading.
    pub fn heading(&self) -> &str {
        self.point
            .as_deref()
            .or(self.subtopic.as_deref())
            .unwrap_or(&self.topic)
    }
}

impl LessonPlanOutline {
    /// Parses lesson plan text into an outline.
    ///
    /// A line without `->` opens a topic. `Topic -> Sub` adds a subtopic to the
    /// current topic, and `Topic -> Sub -> Point` adds a point to the current
    /// subtopic. Lines that do not name the current topic/subtopic are dropped,
    /// as are lines nested deeper than three levels.
    pub fn parse(text: &str) -> Self {
        let mut topics: Vec<Topic> = Vec::new();
        let mut current_subtopic: Option<String> = None;

        for line in text.trim().lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split(LEVEL_SEPARATOR).map(str::trim).collect();
            match parts.as_slice() {
                [topic] => {
                    topics.push(Topic {
                        title: topic.to_string(),
                        subtopics: Vec::new(),
                    });
                    current_subtopic = None;
                }
                [topic, subtopic] => {
                    if let Some(current) = topics.last_mut().filter(|t| t.title == *topic) {
                        current.subtopics.push(Subtopic {
                            title: subtopic.to_string(),
                            points: Vec::new(),
                        });
                        current_subtopic = Some(subtopic.to_string());
                    }
                }
                [topic, subtopic, point] => {
                    let Some(current) = topics.last_mut().filter(|t| t.title == *topic) else {
                        continue;
                    };
                    if current_subtopic.as_deref() != Some(*subtopic) {
                        continue;
                    }
                    if let Some(sub) = current.subtopics.last_mut() {
                        sub.points.push(point.to_string());
                    }
                }
                _ => {}
            }
        }

        Self { topics }
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Flattens the outline into generation units, in document order.
    ///
    /// Every point is its own section. A subtopic without points and a topic
    /// without subtopics each become a single section.
    pub fn sections(&self) -> Vec<SectionRef> {
        let mut sections = Vec::new();
        for topic in &self.topics {
            if topic.subtopics.is_empty() {
                sections.push(SectionRef::topic_only(&topic.title));
                continue;
            }
            for sub in &topic.subtopics {
                if sub.points.is_empty() {
                    sections.push(SectionRef {
                        topic: topic.title.clone(),
                        subtopic: Some(sub.title.clone()),
                        point: None,
                    });
                    continue;
                }
                for point in &sub.points {
                    sections.push(SectionRef {
                        topic: topic.title.clone(),
                        subtopic: Some(sub.title.clone()),
                        point: Some(point.clone()),
                    });
                }
            }
        }
        sections
    }
}
