use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Numeric id of a redirect row.
pub type RedirectId = u64;

/// A redirect row about to be inserted.
///
/// Timestamps are Unix seconds; `endtime == 0` means the redirect never
/// expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct NewRedirect {
    #[builder(default)]
    pub pid: u32,
    pub createdon: i64,
    pub updatedon: i64,
    #[builder(default)]
    pub createdby: u32,
    #[builder(default)]
    pub deleted: bool,
    #[builder(default)]
    pub disabled: bool,
    #[builder(default)]
    pub starttime: i64,
    #[builder(default)]
    pub endtime: i64,
    #[builder(setter(into))]
    pub source_host: String,
    #[builder(setter(into))]
    pub source_path: String,
    #[builder(default)]
    pub is_regexp: bool,
    #[builder(default)]
    pub force_https: bool,
    #[builder(default)]
    pub respect_query_parameters: bool,
    #[builder(setter(into))]
    pub target: String,
    pub target_statuscode: u16,
    #[builder(default)]
    pub hitcount: u64,
    #[builder(default)]
    pub lasthiton: i64,
    #[builder(default)]
    pub disable_hitcount: bool,
}

impl NewRedirect {
    /// Attaches the id assigned by the store.
    pub fn with_uid(self, uid: RedirectId) -> RedirectRecord {
        RedirectRecord {
            uid,
            redirect: self,
        }
    }
}

/// A stored redirect row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRecord {
    pub uid: RedirectId,
    #[serde(flatten)]
    pub redirect: NewRedirect,
}

impl RedirectRecord {
    /// Whether the redirect has expired at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.redirect.endtime > 0 && self.redirect.endtime <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect(endtime: i64) -> NewRedirect {
        NewRedirect::builder()
            .createdon(100)
            .updatedon(100)
            .endtime(endtime)
            .source_host("*")
            .source_path("/a")
            .target("/b")
            .target_statuscode(307)
            .build()
    }

    #[test]
    fn builder_defaults_counters_and_flags_to_zero() {
        let r = redirect(0);
        assert_eq!(r.pid, 0);
        assert_eq!(r.hitcount, 0);
        assert_eq!(r.lasthiton, 0);
        assert!(!r.is_regexp && !r.force_https && !r.respect_query_parameters);
        assert!(!r.deleted && !r.disabled && !r.disable_hitcount);
    }

    #[test]
    fn zero_endtime_never_expires() {
        let record = redirect(0).with_uid(1);
        assert!(!record.is_expired_at(i64::MAX));
    }

    #[test]
    fn endtime_expires() {
        let record = redirect(200).with_uid(1);
        assert!(!record.is_expired_at(199));
        assert!(record.is_expired_at(200));
    }

    #[test]
    fn record_serializes_flat_with_uid() {
        let value = serde_json::to_value(redirect(0).with_uid(9)).unwrap();
        assert_eq!(value["uid"], 9);
        assert_eq!(value["source_path"], "/a");
        assert_eq!(value["target_statuscode"], 307);
    }
}
