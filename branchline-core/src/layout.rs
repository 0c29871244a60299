//! Minimap layout geometry
//!
//! Purely numeric, no I/O: turns messages and branch points into
//! proportional bar heights, hit-test indices, and branch offshoot
//! geometry. Content length is a cheap visual-weight proxy, not a
//! rendering metric; it only has to be stable for the same input so layout
//! results can be cached.

use crate::branches::BranchPoint;
use crate::types::{ContentBlock, Message, ToolResultContent};
use serde::{Deserialize, Serialize};

/// Minimum visual fraction of an offshoot bar, keeping zero-length
/// messages clickable.
const MIN_OFFSHOOT_BAR_FRACTION: f64 = 0.005;

/// Maximum share of the main spine's height an offshoot may occupy.
const MAX_OFFSHOOT_SPINE_SHARE: f64 = 0.3;

/// Layout geometry for one branch point on the minimap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchLayout {
    /// Position of the fork within the active path
    pub message_index: usize,
    /// Vertical fraction of the fork along the main spine, in `[0, 1]`
    pub fork_fraction: f64,
    /// One entry per alternate path (the active continuation is skipped)
    pub offshoots: Vec<OffshootLayout>,
}

/// Geometry for one alternate path hanging off a fork.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffshootLayout {
    /// Index into `BranchPoint::paths` this offshoot renders
    pub path_index: usize,
    /// Per-message heights as fractions of the main spine's total height
    pub bars: Vec<f64>,
}

/// Estimate the visual weight of a message's content.
///
/// Sum of text lengths, thinking lengths, serialized tool input length,
/// and tool result length (string length or serialized length depending on
/// shape).
pub fn estimate_content_length(content: &[ContentBlock]) -> f64 {
    let mut total = 0usize;
    for block in content {
        match block {
            ContentBlock::Text { text } => total += text.len(),
            ContentBlock::Thinking { thinking, .. } => total += thinking.len(),
            ContentBlock::ToolUse { input, .. } => {
                total += serde_json::to_string(input).map(|s| s.len()).unwrap_or(0)
            }
            ContentBlock::ToolResult { content, .. } => match content {
                ToolResultContent::Text(s) => total += s.len(),
                ToolResultContent::Blocks(blocks) => {
                    total += serde_json::to_string(blocks).map(|s| s.len()).unwrap_or(0)
                }
            },
        }
    }
    total as f64
}

/// Estimated content length for each message of a path.
pub fn estimate_path_lengths(path: &[Message]) -> Vec<f64> {
    path.iter()
        .map(|m| estimate_content_length(&m.content))
        .collect()
}

/// Allocate `total_height` across bars proportionally to `lengths`, with a
/// minimum bar height.
///
/// Two passes: proportional allocation, then any bar below
/// `min_bar_height` is clamped to it and the remaining budget is
/// redistributed proportionally among the unclamped bars only. All-zero
/// lengths split evenly; empty input returns empty. Heights sum to
/// `total_height` whenever `min_bar_height * count <= total_height`.
pub fn compute_bar_heights(lengths: &[f64], total_height: f64, min_bar_height: f64) -> Vec<f64> {
    if lengths.is_empty() {
        return Vec::new();
    }

    let total_length: f64 = lengths.iter().sum();
    if total_length <= 0.0 {
        return vec![total_height / lengths.len() as f64; lengths.len()];
    }

    let proportional: Vec<f64> = lengths
        .iter()
        .map(|&len| total_height * len / total_length)
        .collect();

    let clamped: Vec<bool> = proportional.iter().map(|&h| h < min_bar_height).collect();
    let clamped_total = min_bar_height * clamped.iter().filter(|&&c| c).count() as f64;
    let unclamped_length: f64 = lengths
        .iter()
        .zip(&clamped)
        .filter(|(_, &c)| !c)
        .map(|(&len, _)| len)
        .sum();

    let remaining = total_height - clamped_total;

    lengths
        .iter()
        .zip(&clamped)
        .map(|(&len, &is_clamped)| {
            if is_clamped {
                min_bar_height
            } else if unclamped_length > 0.0 {
                remaining * len / unclamped_length
            } else {
                min_bar_height
            }
        })
        .collect()
}

/// Index of the bar whose cumulative-height interval contains
/// `click_offset`. Clicks beyond the end clamp to the last index; empty
/// input returns 0.
pub fn hit_test_message_index(click_offset: f64, bar_heights: &[f64]) -> usize {
    if bar_heights.is_empty() {
        return 0;
    }

    let mut cumulative = 0.0;
    for (i, &height) in bar_heights.iter().enumerate() {
        cumulative += height;
        if click_offset < cumulative {
            return i;
        }
    }
    bar_heights.len() - 1
}

/// Compute offshoot geometry for every branch point.
///
/// `main_bar_heights` and `main_lengths` describe the active path's bars:
/// rendered heights and estimated content lengths, index-aligned with the
/// path. For each branch point the fork's vertical fraction is the
/// cumulative height up to and including the fork, over the total height.
/// Each alternate path except index 0 (the active continuation) becomes an
/// offshoot whose total height is capped at 30% of the spine, preserving
/// relative proportions among its own bars, each floored at 0.005 of the
/// spine so zero-length messages stay clickable.
///
/// Returns empty if the spine's total height is zero.
pub fn compute_branch_layout(
    main_bar_heights: &[f64],
    main_lengths: &[f64],
    branch_points: &[BranchPoint],
) -> Vec<BranchLayout> {
    let total_height: f64 = main_bar_heights.iter().sum();
    if total_height <= 0.0 {
        return Vec::new();
    }
    let main_length_total: f64 = main_lengths.iter().sum();

    let mut layouts = Vec::new();

    for point in branch_points {
        if point.message_index >= main_bar_heights.len() {
            continue;
        }

        let cumulative: f64 = main_bar_heights[..=point.message_index].iter().sum();
        let fork_fraction = cumulative / total_height;

        let mut offshoots = Vec::new();
        for (path_index, path) in point.paths.iter().enumerate().skip(1) {
            let lengths = estimate_path_lengths(path);
            offshoots.push(OffshootLayout {
                path_index,
                bars: offshoot_bars(&lengths, main_length_total),
            });
        }

        layouts.push(BranchLayout {
            message_index: point.message_index,
            fork_fraction,
            offshoots,
        });
    }

    layouts
}

/// Scale one offshoot's bar fractions against the main spine.
///
/// The offshoot's share of the spine is its total estimated length over
/// the spine's, capped at [`MAX_OFFSHOOT_SPINE_SHARE`]; individual bars
/// keep their relative proportions within that share, floored at
/// [`MIN_OFFSHOOT_BAR_FRACTION`].
fn offshoot_bars(lengths: &[f64], main_length_total: f64) -> Vec<f64> {
    if lengths.is_empty() {
        return Vec::new();
    }

    let offshoot_total: f64 = lengths.iter().sum();
    let share = if main_length_total > 0.0 {
        (offshoot_total / main_length_total).min(MAX_OFFSHOOT_SPINE_SHARE)
    } else {
        MAX_OFFSHOOT_SPINE_SHARE
    };

    if offshoot_total <= 0.0 {
        return vec![MIN_OFFSHOOT_BAR_FRACTION; lengths.len()];
    }

    lengths
        .iter()
        .map(|&len| (share * len / offshoot_total).max(MIN_OFFSHOOT_BAR_FRACTION))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Role};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    #[test]
    fn test_estimate_content_length() {
        let content = vec![
            ContentBlock::text("hello"),
            ContentBlock::Thinking {
                thinking: "mmm".to_string(),
                signature: None,
            },
            ContentBlock::ToolUse {
                id: "t1".to_string(),
                name: "Read".to_string(),
                input: serde_json::json!({"path": "/tmp/x"}),
            },
            ContentBlock::ToolResult {
                tool_use_id: "t1".to_string(),
                content: ToolResultContent::Text("result".to_string()),
                is_error: None,
            },
        ];

        let input_len = serde_json::to_string(&serde_json::json!({"path": "/tmp/x"}))
            .unwrap()
            .len() as f64;
        assert_close(
            estimate_content_length(&content),
            5.0 + 3.0 + input_len + 6.0,
        );

        // Stability: same input, same output
        assert_close(
            estimate_content_length(&content),
            estimate_content_length(&content),
        );
    }

    #[test]
    fn test_bar_heights_proportional() {
        let heights = compute_bar_heights(&[10.0, 30.0], 100.0, 1.0);
        assert_close(heights[0], 25.0);
        assert_close(heights[1], 75.0);
    }

    #[test]
    fn test_bar_heights_min_clamp_redistributes() {
        // Scenario: one tiny bar, one huge bar
        let heights = compute_bar_heights(&[1.0, 1000.0], 100.0, 5.0);
        assert!(heights[0] >= 5.0);
        assert!(heights[1] >= 5.0);
        assert_close(heights.iter().sum::<f64>(), 100.0);
        assert_close(heights[0], 5.0);
        assert_close(heights[1], 95.0);
    }

    #[test]
    fn test_bar_heights_all_zero_split_evenly() {
        let heights = compute_bar_heights(&[0.0, 0.0, 0.0, 0.0], 100.0, 1.0);
        for &h in &heights {
            assert_close(h, 25.0);
        }
    }

    #[test]
    fn test_bar_heights_empty() {
        assert!(compute_bar_heights(&[], 100.0, 5.0).is_empty());
    }

    #[test]
    fn test_bar_heights_conservation_under_clamping() {
        // Mixed sizes so several bars clamp but the budget still fits
        let lengths = [1.0, 2.0, 500.0, 3.0, 800.0];
        let heights = compute_bar_heights(&lengths, 200.0, 8.0);
        assert_close(heights.iter().sum::<f64>(), 200.0);
        for &h in &heights {
            assert!(h >= 8.0 - 1e-9);
        }
    }

    #[test]
    fn test_hit_test_basic() {
        let bars = [10.0, 20.0, 30.0];
        assert_eq!(hit_test_message_index(0.0, &bars), 0);
        assert_eq!(hit_test_message_index(9.9, &bars), 0);
        assert_eq!(hit_test_message_index(10.0, &bars), 1);
        assert_eq!(hit_test_message_index(29.9, &bars), 1);
        assert_eq!(hit_test_message_index(30.0, &bars), 2);
        assert_eq!(hit_test_message_index(59.9, &bars), 2);
    }

    #[test]
    fn test_hit_test_clamps_and_empty() {
        let bars = [10.0, 20.0];
        assert_eq!(hit_test_message_index(1000.0, &bars), 1);
        assert_eq!(hit_test_message_index(5.0, &[]), 0);
    }

    #[test]
    fn test_hit_test_monotonic_full_coverage() {
        let bars = [7.0, 3.0, 15.0, 1.0];
        let total: f64 = bars.iter().sum();
        let mut last = 0usize;
        let mut offset = 0.0;
        while offset < total {
            let idx = hit_test_message_index(offset, &bars);
            assert!(idx < bars.len());
            assert!(idx >= last);
            last = idx;
            offset += 0.25;
        }
    }

    fn msg_with_text(uuid: &str, text: &str) -> Message {
        let mut m = Message::new(uuid, None, Role::User);
        m.content = vec![ContentBlock::text(text)];
        m
    }

    #[test]
    fn test_branch_layout_skips_active_continuation() {
        let point = BranchPoint {
            message_index: 1,
            fork_message_uuid: "a1".to_string(),
            paths: vec![
                vec![msg_with_text("active", "current continuation")],
                vec![msg_with_text("alt", "old branch")],
            ],
        };

        let main_heights = [10.0, 10.0, 10.0, 10.0];
        let main_lengths = [100.0, 100.0, 100.0, 100.0];
        let layouts = compute_branch_layout(&main_heights, &main_lengths, &[point]);

        assert_eq!(layouts.len(), 1);
        assert_close(layouts[0].fork_fraction, 0.5);
        assert_eq!(layouts[0].offshoots.len(), 1);
        assert_eq!(layouts[0].offshoots[0].path_index, 1);
    }

    #[test]
    fn test_branch_layout_share_cap_and_floor() {
        let huge = "x".repeat(10_000);
        let point = BranchPoint {
            message_index: 0,
            fork_message_uuid: "r".to_string(),
            paths: vec![
                vec![msg_with_text("active", "a")],
                vec![msg_with_text("big", &huge), msg_with_text("empty", "")],
            ],
        };

        let main_heights = [10.0, 10.0];
        let main_lengths = [50.0, 50.0];
        let layouts = compute_branch_layout(&main_heights, &main_lengths, &[point]);

        let bars = &layouts[0].offshoots[0].bars;
        // Offshoot dwarfs the spine, so its share caps at 30%
        assert!(bars.iter().sum::<f64>() <= 0.3 + MIN_OFFSHOOT_BAR_FRACTION);
        // Zero-length message stays clickable
        assert_close(bars[1], MIN_OFFSHOOT_BAR_FRACTION);
    }

    #[test]
    fn test_branch_layout_zero_spine_returns_empty() {
        let point = BranchPoint {
            message_index: 0,
            fork_message_uuid: "r".to_string(),
            paths: vec![vec![], vec![]],
        };
        let layouts = compute_branch_layout(&[], &[], &[point.clone()]);
        assert!(layouts.is_empty());

        let layouts = compute_branch_layout(&[0.0, 0.0], &[0.0, 0.0], &[point]);
        assert!(layouts.is_empty());
    }
}
