use chrono::{DateTime, Utc};
use mason_types::{
    format_created_at, ComplexityHint, Story, TaskConstraints, TaskExecution, TaskGoal,
    TaskIdentity, TaskInputs, TaskMetadata, TaskPacket, TaskProviderContext,
};
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECONDS: u32 = 300;
const BULLET_MARKERS: [char; 4] = ['-', '*', '•', '✓'];

/// Configuration the compiler needs from `decomposition.*` (§6).
#[derive(Debug, Clone, Copy)]
pub struct CompilerConfig {
    pub default_max_attempts: u32,
    pub max_tasks_per_story: usize,
}

/// Pure `Story -> [TaskPacket]` transformation (§4.1). Holds no mutable
/// state beyond its config; `compile` never fails, it only ever produces
/// fewer packets than expected for malformed input.
pub struct TaskCompiler {
    config: CompilerConfig,
}

impl TaskCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, story: &Story) -> Vec<TaskPacket> {
        let criteria = parse_acceptance_criteria(&story.acceptance_criteria);
        if criteria.is_empty() {
            return Vec::new();
        }

        let now = Utc::now();
        let complexity = ComplexityHint::from_est_points(story.est_points);
        let mut tasks = Vec::new();

        if criteria.len() <= 3 {
            tasks.push(self.build_packet(story, criteria, 0, now, complexity));
            return tasks;
        }

        // Mirrors the Python original's `for i in range(0, len(criteria), 3):
        // if len(tasks) < self.max_tasks: tasks.append(...)` — iteration
        // continues past the cap, silently discarding the remainder, rather
        // than stopping the chunk iterator early.
        for (index, chunk) in criteria.chunks(3).enumerate() {
            if tasks.len() < self.config.max_tasks_per_story {
                tasks.push(self.build_packet(story, chunk.to_vec(), index, now, complexity));
            }
        }

        tasks
    }

    /// Returns a copy of `packet` with retry guidance and attempt number
    /// replaced. `packet` itself is unchanged — thin forwarding wrapper
    /// kept here so callers don't need to import `mason_types` directly
    /// for this one operation.
    pub fn enrich_for_retry(
        &self,
        packet: &TaskPacket,
        guidance: Vec<String>,
        attempt: u32,
    ) -> TaskPacket {
        packet.enriched_for_retry(guidance, attempt)
    }

    fn build_packet(
        &self,
        story: &Story,
        criteria: Vec<String>,
        index: usize,
        now: DateTime<Utc>,
        complexity: ComplexityHint,
    ) -> TaskPacket {
        let title = if index == 0 {
            story.title.clone()
        } else {
            format!("{} (Part {})", story.title, index + 1)
        };

        TaskPacket {
            identity: TaskIdentity {
                task_id: Uuid::new_v4(),
                story_id: story.id,
                epic_id: story.epic_id,
            },
            goal: TaskGoal {
                title,
                description: story.narrative.clone(),
                success_criteria: criteria,
            },
            constraints: TaskConstraints {
                file_scope: infer_file_scope(story),
                ..Default::default()
            },
            inputs: TaskInputs::default(),
            execution: TaskExecution {
                max_attempts: self.config.default_max_attempts,
                current_attempt: 0,
                timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            },
            provider_context: TaskProviderContext {
                preferred_model: None,
                complexity_hint: complexity,
            },
            metadata: TaskMetadata {
                created_at: format_created_at(now),
                source_domain: "devbacklog".to_string(),
                priority: story.priority,
                est_points: story.est_points,
            },
        }
    }
}

/// Seam for a future NLP-based inference of the files a story is likely to
/// touch. Returns empty today, matching the Python original's stub.
fn infer_file_scope(_story: &Story) -> Vec<String> {
    Vec::new()
}

/// Splits raw acceptance-criteria text on line boundaries, trims
/// whitespace, strips a leading bullet marker and/or a leading
/// `<digits>.` numeric prefix, and discards empty lines. Never panics on
/// malformed input — worst case it returns an empty vector.
pub fn parse_acceptance_criteria(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_criterion_prefix)
        .collect()
}

fn strip_criterion_prefix(line: &str) -> String {
    let mut rest = line;

    if let Some(first) = rest.chars().next() {
        if BULLET_MARKERS.contains(&first) {
            rest = rest[first.len_utf8()..].trim_start();
        }
    }

    // Independently check whether the first three characters of the
    // (possibly bullet-stripped) remainder contain a '.' preceded only by
    // ASCII digits, e.g. "3." or "12.".
    let lookahead: Vec<char> = rest.chars().take(3).collect();
    if let Some(dot_pos) = lookahead.iter().position(|&c| c == '.') {
        if dot_pos > 0 && lookahead[..dot_pos].iter().all(|c| c.is_ascii_digit()) {
            let byte_offset: usize = lookahead[..=dot_pos].iter().map(|c| c.len_utf8()).sum();
            rest = rest[byte_offset..].trim_start();
        }
    }

    rest.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(acceptance_criteria: &str, est_points: Option<i32>) -> Story {
        Story {
            id: 42,
            title: "Add retry backoff".to_string(),
            narrative: "As a user I want retries to back off.".to_string(),
            acceptance_criteria: acceptance_criteria.to_string(),
            epic_id: Some(7),
            priority: 3,
            est_points,
        }
    }

    #[test]
    fn parses_bullets_and_numeric_prefixes() {
        let raw = "- first\n* second\n1. third\n12. fourth\n✓ fifth\n\nnope.not.numeric";
        let parsed = parse_acceptance_criteria(raw);
        assert_eq!(
            parsed,
            vec!["first", "second", "third", "fourth", "fifth", "nope.not.numeric"]
        );
    }

    #[test]
    fn simple_story_emits_one_packet() {
        let compiler = TaskCompiler::new(CompilerConfig {
            default_max_attempts: 3,
            max_tasks_per_story: 10,
        });
        let s = story("- one\n- two", None);
        let packets = compiler.compile(&s);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].goal.success_criteria.len(), 2);
        assert_eq!(packets[0].execution.current_attempt, 0);
        assert_eq!(packets[0].execution.max_attempts, 3);
        assert!(packets[0].metadata.created_at.ends_with('Z'));
        assert_eq!(packets[0].provider_context.complexity_hint, ComplexityHint::Medium);
    }

    #[test]
    fn decomposes_into_chunks_of_three_with_part_suffix() {
        let compiler = TaskCompiler::new(CompilerConfig {
            default_max_attempts: 3,
            max_tasks_per_story: 10,
        });
        let raw = (1..=7).map(|i| format!("- criterion {i}")).collect::<Vec<_>>().join("\n");
        let s = story(&raw, Some(8));
        let packets = compiler.compile(&s);
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].goal.success_criteria.len(), 3);
        assert_eq!(packets[1].goal.success_criteria.len(), 3);
        assert_eq!(packets[2].goal.success_criteria.len(), 1);
        assert_eq!(packets[0].goal.title, "Add retry backoff");
        assert_eq!(packets[1].goal.title, "Add retry backoff (Part 2)");
        assert_eq!(packets[2].goal.title, "Add retry backoff (Part 3)");
        assert_eq!(packets[0].provider_context.complexity_hint, ComplexityHint::High);
    }

    #[test]
    fn caps_emitted_packets_at_max_tasks_per_story() {
        let compiler = TaskCompiler::new(CompilerConfig {
            default_max_attempts: 3,
            max_tasks_per_story: 2,
        });
        let raw = (1..=12).map(|i| format!("- criterion {i}")).collect::<Vec<_>>().join("\n");
        let s = story(&raw, None);
        let packets = compiler.compile(&s);
        assert_eq!(packets.len(), 2);
    }

    #[test]
    fn malformed_criteria_yields_no_packets() {
        let compiler = TaskCompiler::new(CompilerConfig {
            default_max_attempts: 3,
            max_tasks_per_story: 10,
        });
        let s = story("", None);
        assert!(compiler.compile(&s).is_empty());
    }

    #[test]
    fn complexity_hint_thresholds() {
        assert_eq!(ComplexityHint::from_est_points(None), ComplexityHint::Medium);
        assert_eq!(ComplexityHint::from_est_points(Some(2)), ComplexityHint::Low);
        assert_eq!(ComplexityHint::from_est_points(Some(5)), ComplexityHint::Medium);
        assert_eq!(ComplexityHint::from_est_points(Some(6)), ComplexityHint::High);
    }

    #[test]
    fn retry_enrichment_leaves_original_untouched() {
        let compiler = TaskCompiler::new(CompilerConfig {
            default_max_attempts: 3,
            max_tasks_per_story: 10,
        });
        let s = story("- one\n- two", None);
        let packet = compiler.compile(&s).remove(0);
        let guidance = vec!["avoid touching migrations".to_string()];
        let enriched = compiler.enrich_for_retry(&packet, guidance.clone(), 1);

        assert_eq!(enriched.inputs.retry_guidance, guidance);
        assert_eq!(enriched.execution.current_attempt, 1);
        assert!(packet.inputs.retry_guidance.is_empty());
        assert_eq!(packet.execution.current_attempt, 0);
    }
}
