// Victim selection: least important process first, largest on ties

use super::source::ProcessCandidate;

/// Pick the single best victim among `candidates` given the active cutoff.
///
/// One pass over the set. A candidate is eligible when it is not a kernel
/// thread, its priority is at or above `cutoff`, and it has positive
/// resident memory. Among eligible candidates the winner is the one with
/// the highest priority value; equal priorities are broken by larger
/// resident size, and remaining ties keep the first candidate seen.
///
/// Malformed candidates (non-positive RSS) are skipped, never an error.
pub fn select_victim(candidates: &[ProcessCandidate], cutoff: i16) -> Option<&ProcessCandidate> {
    let mut selected: Option<&ProcessCandidate> = None;

    for candidate in candidates {
        if candidate.kernel_thread {
            continue;
        }
        if candidate.priority < cutoff {
            continue;
        }
        if candidate.rss_kb <= 0 {
            continue;
        }
        if let Some(best) = selected {
            if candidate.priority < best.priority {
                continue;
            }
            if candidate.priority == best.priority && candidate.rss_kb <= best.rss_kb {
                continue;
            }
        }
        log::trace!("select {candidate} to kill");
        selected = Some(candidate);
    }

    selected
}
