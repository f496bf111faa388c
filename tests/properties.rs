//! Properties of the thinning arithmetic and the frame file names.

use std::path::Path;

use posterior_movie::thinning::{FrameRequest, FrameSelection};
use proptest::prelude::*;

/// A valid (N, F) pair: at least two iterations per frame gap.
fn count_request() -> impl Strategy<Value = (usize, usize)> {
    (2usize..20_000).prop_flat_map(|n| (Just(n), 2..=n / 2 + 1))
}

proptest! {
    #[test]
    fn frame_count_is_honored_and_in_bounds((n, count) in count_request()) {
        let selection = FrameSelection::resolve(FrameRequest::Count(count), n, 0).unwrap();
        prop_assert_eq!(selection.frame_count, count);
        prop_assert!(selection.iterations().all(|i| i < n));
    }

    #[test]
    fn frame_step_is_the_interval(n in 1usize..20_000, step in 1usize..5_000) {
        let selection = FrameSelection::resolve(FrameRequest::Step(step), n, 0).unwrap();
        prop_assert_eq!(selection.interval, step);
        prop_assert_eq!(selection.frame_count, n / (step + 1) + 1);
        prop_assert!(selection.iterations().all(|i| i < n));
    }

    #[test]
    fn exactly_one_frame_option_is_required(count in 0usize..100, step in 0usize..100) {
        prop_assert!(FrameRequest::from_options(Some(count), Some(step)).unwrap_err().is_config());
        prop_assert!(FrameRequest::from_options(None, None).unwrap_err().is_config());
    }

    #[test]
    fn file_names_sort_in_frame_order(n in 1usize..50_000, step in 1usize..2_000) {
        let selection = FrameSelection::resolve(FrameRequest::Step(step), n, 0).unwrap();
        let names: Vec<String> = (0..selection.frame_count)
            .map(|k| {
                let path = selection.frame_path(Path::new("frames/post"), k);
                path.to_string_lossy().into_owned()
            })
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        prop_assert_eq!(&sorted, &names);

        let width = selection.max_sample_number().to_string().len();
        prop_assert!(names.iter().all(|name| name.len() == "frames/post-.png".len() + width));
    }
}

#[test]
fn scenario_frame_step_nine() {
    let selection = FrameSelection::resolve(FrameRequest::Step(9), 100, 0).unwrap();
    assert_eq!(selection.interval, 9);
    assert_eq!(selection.frame_count, 11);
    let numbers: Vec<usize> = (0..11).map(|k| selection.sample_number(k)).collect();
    assert_eq!(numbers, vec![1, 10, 19, 28, 37, 46, 55, 64, 73, 82, 91]);
}

#[test]
fn scenario_frame_number_eleven() {
    let selection = FrameSelection::resolve(FrameRequest::Count(11), 100, 0).unwrap();
    assert_eq!(selection.interval, 9);
    assert_eq!(selection.frame_count, 11);
}
