use super::builders::{day, COURSE_KEY};
use credentials_dispatch::models::{CertificatesDisplayBehavior, CourseOverviewSnapshot};
use proptest::prelude::*;

/// Strategy for optional display behaviors
pub fn display_behavior_strategy() -> impl Strategy<Value = Option<CertificatesDisplayBehavior>> {
    prop_oneof![
        Just(None),
        Just(Some(CertificatesDisplayBehavior::EarlyNoInfo)),
        Just(Some(CertificatesDisplayBehavior::End)),
        Just(Some(CertificatesDisplayBehavior::EndWithDate)),
    ]
}

/// Strategy for overviews of the shared test course run
pub fn overview_strategy() -> impl Strategy<Value = CourseOverviewSnapshot> {
    (
        proptest::option::of(1u32..28),
        proptest::option::of(1u32..28),
        any::<bool>(),
        proptest::option::of(1u32..28),
        display_behavior_strategy(),
    )
        .prop_map(|(start, end, self_paced, available, behavior)| {
            CourseOverviewSnapshot::new(COURSE_KEY)
                .with_start(start.map(day))
                .with_end(end.map(day))
                .with_self_paced(self_paced)
                .with_certificate_available_date(available.map(day))
                .with_display_behavior(behavior)
        })
}
