//! Process table queries
//!
//! A bare PID check says "alive" for any process that inherited a recycled
//! PID. On Linux the start time from `/proc/<pid>/stat` is recorded at
//! launch and must still match; elsewhere a signal-0 probe is the best the
//! platform offers.

/// Identity of a process beyond its PID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessFingerprint {
    /// Start time in clock ticks since boot
    pub start_ticks: u64,
}

impl ProcessFingerprint {
    #[cfg(target_os = "linux")]
    pub fn capture(pid: u32) -> Option<Self> {
        read_stat(pid).map(|stat| Self {
            start_ticks: stat.start_ticks,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn capture(_pid: u32) -> Option<Self> {
        None
    }
}

/// Whether `pid` is a live, non-zombie process matching `fingerprint`
#[cfg(target_os = "linux")]
pub fn is_running(pid: u32, fingerprint: Option<&ProcessFingerprint>) -> bool {
    match read_stat(pid) {
        Some(stat) => {
            !matches!(stat.state, 'Z' | 'X' | 'x')
                && fingerprint.map_or(true, |f| f.start_ticks == stat.start_ticks)
        }
        None => false,
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn is_running(pid: u32, _fingerprint: Option<&ProcessFingerprint>) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
pub fn is_running(_pid: u32, _fingerprint: Option<&ProcessFingerprint>) -> bool {
    // Without a process table query the reaped-child check in the caller is all we have.
    true
}

#[cfg(any(target_os = "linux", test))]
#[derive(Debug, PartialEq, Eq)]
struct ProcStat {
    state: char,
    start_ticks: u64,
}

#[cfg(target_os = "linux")]
fn read_stat(pid: u32) -> Option<ProcStat> {
    let raw = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    parse_stat(&raw)
}

#[cfg(any(target_os = "linux", test))]
fn parse_stat(raw: &str) -> Option<ProcStat> {
    // comm (field 2) may itself contain spaces and parentheses
    let rest = &raw[raw.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    // state is field 3, starttime is field 22
    let start_ticks = fields.nth(18)?.parse().ok()?;
    Some(ProcStat { state, start_ticks })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "4242 (drivechain-qt) S 1 4242 4242 0 -1 4194560 1520 0 0 0 \
                        12 3 0 0 20 0 9 0 987654 123456789 2048 18446744073709551615";

    #[test]
    fn test_parse_stat_fields() {
        let stat = parse_stat(STAT).unwrap();
        assert_eq!(
            stat,
            ProcStat {
                state: 'S',
                start_ticks: 987654
            }
        );
    }

    #[test]
    fn test_parse_stat_with_parens_in_name() {
        let raw = STAT.replace("(drivechain-qt)", "(node (x) y)");
        assert_eq!(parse_stat(&raw).unwrap().start_ticks, 987654);
    }

    #[test]
    fn test_parse_stat_rejects_truncated() {
        assert!(parse_stat("4242 (node) S 1 2").is_none());
        assert!(parse_stat("garbage").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_own_process_is_running_and_fingerprinted() {
        let pid = std::process::id();
        let fingerprint = ProcessFingerprint::capture(pid).unwrap();
        assert!(is_running(pid, Some(&fingerprint)));

        let recycled = ProcessFingerprint {
            start_ticks: fingerprint.start_ticks + 1,
        };
        assert!(!is_running(pid, Some(&recycled)));
    }
}
