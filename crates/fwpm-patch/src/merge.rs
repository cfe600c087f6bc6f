//! Line-level three-way merge.
//!
//! Merges a patch's post-image ("patch") into the current file
//! ("current") using the patch's recorded pre-image as the common base.
//! Regions changed on only one side take that side; regions changed the
//! same way on both sides collapse; regions changed differently are
//! left in place between conflict markers instead of aborting.

/// Conflict marker opening the current tree's side.
pub const CONFLICT_BEGIN: &str = "<<<<<<< current";
/// Conflict marker separating the two sides.
pub const CONFLICT_SEP: &str = "=======";
/// Conflict marker closing the patch's side.
pub const CONFLICT_END: &str = ">>>>>>> patch";

/// Result of merging one file.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Every change merged; the merged text is safe to write.
    Clean(String),
    /// Overlapping differing edits; the text contains conflict markers.
    Conflicted { text: String, conflicts: usize },
}

impl MergeOutcome {
    /// The merged text, markers included when conflicted.
    pub fn text(&self) -> &str {
        match self {
            MergeOutcome::Clean(text) => text,
            MergeOutcome::Conflicted { text, .. } => text,
        }
    }
}

/// A contiguous difference against the base:
/// `base[base_start..base_end]` became `new[new_start..new_end]`.
#[derive(Debug, Clone, PartialEq)]
struct Hunk {
    base_start: usize,
    base_end: usize,
    new_start: usize,
    new_end: usize,
}

/// Three-way merge of line sequences.
///
/// `base` is the patch's recorded pre-image, `ours` the current file,
/// `theirs` the patch's post-image.
pub fn merge(base_text: &str, ours_text: &str, theirs_text: &str) -> MergeOutcome {
    let base: Vec<&str> = base_text.lines().collect();
    let ours: Vec<&str> = ours_text.lines().collect();
    let theirs: Vec<&str> = theirs_text.lines().collect();

    let ours_hunks = diff_hunks(&base, &ours);
    let theirs_hunks = diff_hunks(&base, &theirs);

    let mut out: Vec<&str> = Vec::new();
    let mut conflicts = 0;
    let mut base_pos = 0;
    let mut i = 0;
    let mut j = 0;
    // Line-index offset of each side relative to base, outside hunks.
    let mut ours_offset: isize = 0;
    let mut theirs_offset: isize = 0;

    while i < ours_hunks.len() || j < theirs_hunks.len() {
        let next_ours = ours_hunks.get(i).map_or(usize::MAX, |h| h.base_start);
        let next_theirs = theirs_hunks.get(j).map_or(usize::MAX, |h| h.base_start);
        let start = next_ours.min(next_theirs);

        out.extend_from_slice(&base[base_pos..start]);

        // Gather every hunk from either side that transitively overlaps
        // the region starting here.
        let gi = i;
        let gj = j;
        let mut end = start;
        loop {
            let mut grew = false;
            while i < ours_hunks.len()
                && (ours_hunks[i].base_start < end
                    || (i == gi && ours_hunks[i].base_start == start))
            {
                end = end.max(ours_hunks[i].base_end);
                i += 1;
                grew = true;
            }
            while j < theirs_hunks.len()
                && (theirs_hunks[j].base_start < end
                    || (j == gj && theirs_hunks[j].base_start == start))
            {
                end = end.max(theirs_hunks[j].base_end);
                j += 1;
                grew = true;
            }
            if !grew {
                break;
            }
        }

        let ours_consumed = &ours_hunks[gi..i];
        let theirs_consumed = &theirs_hunks[gj..j];
        let ours_region = &ours[side_range(start, end, ours_consumed, ours_offset)];
        let theirs_region = &theirs[side_range(start, end, theirs_consumed, theirs_offset)];

        for h in ours_consumed {
            ours_offset += (h.new_end - h.new_start) as isize - (h.base_end - h.base_start) as isize;
        }
        for h in theirs_consumed {
            theirs_offset +=
                (h.new_end - h.new_start) as isize - (h.base_end - h.base_start) as isize;
        }

        if theirs_consumed.is_empty() || ours_region == theirs_region {
            out.extend_from_slice(ours_region);
        } else if ours_consumed.is_empty() {
            out.extend_from_slice(theirs_region);
        } else {
            conflicts += 1;
            out.push(CONFLICT_BEGIN);
            out.extend_from_slice(ours_region);
            out.push(CONFLICT_SEP);
            out.extend_from_slice(theirs_region);
            out.push(CONFLICT_END);
        }

        base_pos = end;
    }

    out.extend_from_slice(&base[base_pos..]);

    let mut text = out.join("\n");
    if !text.is_empty()
        && (base_text.ends_with('\n') || ours_text.ends_with('\n') || theirs_text.ends_with('\n'))
    {
        text.push('\n');
    }

    if conflicts == 0 {
        MergeOutcome::Clean(text)
    } else {
        MergeOutcome::Conflicted { text, conflicts }
    }
}

/// Map a base region onto one side's line range.
///
/// Outside hunks both sequences run in lockstep (shifted by `offset`);
/// inside, the consumed hunks pin the endpoints.
fn side_range(
    start: usize,
    end: usize,
    consumed: &[Hunk],
    offset: isize,
) -> std::ops::Range<usize> {
    match (consumed.first(), consumed.last()) {
        (Some(first), Some(last)) => {
            let lo = first.new_start - (first.base_start - start);
            let hi = last.new_end + (end - last.base_end);
            lo..hi
        }
        _ => {
            let lo = (start as isize + offset) as usize;
            let hi = (end as isize + offset) as usize;
            lo..hi
        }
    }
}

/// Compute difference hunks between base and a derived sequence.
///
/// Hunks are maximal non-matching runs under a longest-common-
/// subsequence alignment; consecutive hunks are always separated by at
/// least one matching line. Common prefix and suffix are trimmed first
/// so the quadratic table only covers the changed middle.
fn diff_hunks(base: &[&str], new: &[&str]) -> Vec<Hunk> {
    let mut prefix = 0;
    while prefix < base.len() && prefix < new.len() && base[prefix] == new[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < base.len() - prefix
        && suffix < new.len() - prefix
        && base[base.len() - 1 - suffix] == new[new.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let b = &base[prefix..base.len() - suffix];
    let n = &new[prefix..new.len() - suffix];
    let bl = b.len();
    let nl = n.len();
    if bl == 0 && nl == 0 {
        return Vec::new();
    }

    let idx = |i: usize, j: usize| i * (nl + 1) + j;
    let mut dp = vec![0u32; (bl + 1) * (nl + 1)];
    for i in (0..bl).rev() {
        for j in (0..nl).rev() {
            dp[idx(i, j)] = if b[i] == n[j] {
                dp[idx(i + 1, j + 1)] + 1
            } else {
                dp[idx(i + 1, j)].max(dp[idx(i, j + 1)])
            };
        }
    }

    let mut hunks = Vec::new();
    let (mut i, mut j) = (0, 0);
    let (mut run_b, mut run_n) = (0, 0);
    while i < bl && j < nl {
        if b[i] == n[j] {
            if run_b < i || run_n < j {
                hunks.push(Hunk {
                    base_start: prefix + run_b,
                    base_end: prefix + i,
                    new_start: prefix + run_n,
                    new_end: prefix + j,
                });
            }
            i += 1;
            j += 1;
            run_b = i;
            run_n = j;
        } else if dp[idx(i + 1, j)] >= dp[idx(i, j + 1)] {
            i += 1;
        } else {
            j += 1;
        }
    }
    if run_b < bl || run_n < nl {
        hunks.push(Hunk {
            base_start: prefix + run_b,
            base_end: prefix + bl,
            new_start: prefix + run_n,
            new_end: prefix + nl,
        });
    }

    hunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "alpha\nbravo\ncharlie\ndelta\necho\n";

    #[test]
    fn patch_applies_to_unchanged_file() {
        let theirs = "alpha\nbravo\nCHARLIE\ndelta\necho\n";
        let result = merge(BASE, BASE, theirs);
        assert_eq!(result, MergeOutcome::Clean(theirs.to_string()));
    }

    #[test]
    fn local_edits_survive_when_patch_changes_nothing() {
        let ours = "alpha\nBRAVO\ncharlie\ndelta\necho\n";
        let result = merge(BASE, ours, BASE);
        assert_eq!(result, MergeOutcome::Clean(ours.to_string()));
    }

    #[test]
    fn disjoint_edits_both_apply() {
        let ours = "ALPHA\nbravo\ncharlie\ndelta\necho\n";
        let theirs = "alpha\nbravo\ncharlie\ndelta\nECHO\n";
        let result = merge(BASE, ours, theirs);
        assert_eq!(
            result,
            MergeOutcome::Clean("ALPHA\nbravo\ncharlie\ndelta\nECHO\n".to_string())
        );
    }

    #[test]
    fn identical_edits_collapse() {
        let both = "alpha\nbravo\nCHARLIE\ndelta\necho\n";
        let result = merge(BASE, both, both);
        assert_eq!(result, MergeOutcome::Clean(both.to_string()));
    }

    #[test]
    fn overlapping_differing_edits_conflict() {
        let ours = "alpha\nbravo\nlocal change\ndelta\necho\n";
        let theirs = "alpha\nbravo\npatch change\ndelta\necho\n";
        let result = merge(BASE, ours, theirs);
        match result {
            MergeOutcome::Conflicted { text, conflicts } => {
                assert_eq!(conflicts, 1);
                assert!(text.contains(CONFLICT_BEGIN));
                assert!(text.contains("local change"));
                assert!(text.contains("patch change"));
                assert!(text.contains(CONFLICT_END));
                // Untouched context survives outside the markers.
                assert!(text.starts_with("alpha\nbravo\n"));
                assert!(text.ends_with("delta\necho\n"));
            }
            MergeOutcome::Clean(_) => panic!("expected a conflict"),
        }
    }

    #[test]
    fn insertion_and_edit_in_different_regions() {
        let ours = "alpha\nbravo\ncharlie\ndelta\necho\nlocal tail\n";
        let theirs = "alpha\nPATCHED\ncharlie\ndelta\necho\n";
        let result = merge(BASE, ours, theirs);
        assert_eq!(
            result,
            MergeOutcome::Clean(
                "alpha\nPATCHED\ncharlie\ndelta\necho\nlocal tail\n".to_string()
            )
        );
    }

    #[test]
    fn competing_insertions_at_same_point_conflict() {
        let ours = "alpha\nours inserted\nbravo\ncharlie\ndelta\necho\n";
        let theirs = "alpha\ntheirs inserted\nbravo\ncharlie\ndelta\necho\n";
        match merge(BASE, ours, theirs) {
            MergeOutcome::Conflicted { conflicts, .. } => assert_eq!(conflicts, 1),
            MergeOutcome::Clean(_) => panic!("expected a conflict"),
        }
    }

    #[test]
    fn deletion_against_modification_conflicts() {
        let ours = "alpha\nbravo\ndelta\necho\n"; // deleted charlie
        let theirs = "alpha\nbravo\nCHARLIE\ndelta\necho\n"; // modified it
        match merge(BASE, ours, theirs) {
            MergeOutcome::Conflicted { text, .. } => {
                assert!(text.contains("CHARLIE"));
            }
            MergeOutcome::Clean(_) => panic!("expected a conflict"),
        }
    }

    #[test]
    fn reapplying_patch_to_post_image_is_clean_noop() {
        let theirs = "alpha\nbravo\nCHARLIE\ndelta\necho\n";
        let result = merge(BASE, theirs, theirs);
        assert_eq!(result, MergeOutcome::Clean(theirs.to_string()));
    }

    #[test]
    fn file_creation_from_empty_base() {
        let result = merge("", "", "new content\n");
        assert_eq!(result, MergeOutcome::Clean("new content\n".to_string()));
    }

    #[test]
    fn multiple_conflicts_counted() {
        let base = "a\nx\nb\nc\nd\ny\ne\n";
        let ours = "a\nX1\nb\nc\nd\nY1\ne\n";
        let theirs = "a\nX2\nb\nc\nd\nY2\ne\n";
        match merge(base, ours, theirs) {
            MergeOutcome::Conflicted { conflicts, .. } => assert_eq!(conflicts, 2),
            MergeOutcome::Clean(_) => panic!("expected conflicts"),
        }
    }
}
