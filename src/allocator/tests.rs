use proptest::prelude::*;
use proptest::sample::{subsequence, Index};

use super::*;
use crate::topology::test_utils::{crtc, mode, output};
use crate::topology::{CrtcId, ModeId, OutputId, PropertyValue, Transform};

fn topology(crtcs: &[u32], outputs: Vec<crate::topology::Output>) -> Topology {
    Topology::new(
        crtcs.iter().copied().map(crtc).collect(),
        outputs,
        vec![mode(1, 1920, 1080, 60.), mode(2, 1280, 720, 60.)],
    )
}

fn request(output: u32, x: i32) -> OutputRequest {
    OutputRequest::enabled(OutputId(output), ModeId(1), x, 0)
}

#[track_caller]
fn driving_crtc(allocation: &Allocation, output: u32) -> CrtcId {
    allocation.crtc_for(OutputId(output)).unwrap().id
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn independent_outputs_get_their_own_crtcs() {
    let topology = topology(
        &[1, 2],
        vec![output(10, "HDMI-1", &[1]), output(11, "DP-1", &[2])],
    );
    let requests = [request(10, 0), request(11, 1920)];

    let allocation = allocate(&requests, &topology).unwrap();

    assert_eq!(driving_crtc(&allocation, 10), CrtcId(1));
    assert_eq!(driving_crtc(&allocation, 11), CrtcId(2));

    let first = allocation.output(OutputId(10)).unwrap();
    assert_eq!(first.properties.primary, Some(true));
    let second = allocation.output(OutputId(11)).unwrap();
    assert_eq!(second.properties.primary, None);

    let c2 = allocation.crtc_for(OutputId(11)).unwrap();
    assert_eq!(c2.new_mode, Some(ModeId(1)));
    assert_eq!((c2.x, c2.y), (1920, 0));
    assert_eq!(c2.outputs, vec![OutputId(11)]);
}

#[test]
fn primary_delta_only_when_changed() {
    let mut hdmi = output(10, "HDMI-1", &[1]);
    hdmi.properties
        .insert("primary".to_owned(), PropertyValue::Bool(true));
    let mut dp = output(11, "DP-1", &[2]);
    dp.properties
        .insert("primary".to_owned(), PropertyValue::Bool(true));
    let topology = topology(&[1, 2], vec![hdmi, dp]);

    let allocation = allocate(&[request(10, 0), request(11, 1920)], &topology).unwrap();

    // Already primary, stays primary: nothing to send.
    assert!(allocation.outputs[0].properties.is_empty());
    // Was primary, no longer is.
    assert_eq!(allocation.outputs[1].properties.primary, Some(false));
}

#[test]
fn presentation_delta_follows_request() {
    let mut hdmi = output(10, "HDMI-1", &[1]);
    hdmi.properties
        .insert("presentation".to_owned(), PropertyValue::Bool(true));
    let topology = topology(&[1, 2], vec![hdmi, output(11, "DP-1", &[2])]);

    let requests = [
        request(10, 0),
        request(11, 1920).with_presentation(true),
    ];
    let allocation = allocate(&requests, &topology).unwrap();

    assert_eq!(allocation.outputs[0].properties.presentation, Some(false));
    assert_eq!(allocation.outputs[1].properties.presentation, Some(true));
}

#[test]
fn single_crtc_cannot_drive_two_independent_outputs() {
    let topology = topology(
        &[1],
        vec![output(10, "HDMI-1", &[1]), output(11, "DP-1", &[1])],
    );

    let res = allocate(&[request(10, 0), request(11, 1920)], &topology);
    assert_eq!(res, Err(AllocationError::Infeasible(OutputId(11))));
}

#[test]
fn hardware_clone_shares_the_source_crtc() {
    let topology = topology(
        &[1],
        vec![output(10, "HDMI-1", &[1]), output(11, "DP-1", &[1])],
    );
    let source = OutputRequest::enabled(OutputId(10), ModeId(2), 100, 50)
        .with_transform(Transform::Rotate180);
    let clone = OutputRequest::clone_of(OutputId(11), &source);

    let allocation = allocate(&[source, clone], &topology).unwrap();

    assert_eq!(allocation.crtcs.len(), 1);
    let c1 = &allocation.crtcs[0];
    assert_eq!(c1.id, CrtcId(1));
    assert_eq!(c1.outputs, vec![OutputId(10), OutputId(11)]);
    assert_eq!(c1.new_mode, Some(ModeId(2)));
    assert_eq!((c1.x, c1.y), (100, 50));
    assert_eq!(c1.transform, Transform::Rotate180);
}

#[test]
fn clone_falls_back_to_a_separate_crtc() {
    let topology = topology(
        &[1, 2],
        vec![output(10, "HDMI-1", &[1]), output(11, "DP-1", &[2])],
    );
    let source = request(10, 0);
    let clone = OutputRequest::clone_of(OutputId(11), &source);

    let allocation = allocate(&[source, clone], &topology).unwrap();

    let c1 = allocation.crtc_for(OutputId(10)).unwrap();
    let c2 = allocation.crtc_for(OutputId(11)).unwrap();
    assert_eq!((c1.id, c2.id), (CrtcId(1), CrtcId(2)));
    assert_eq!(c2.outputs, vec![OutputId(11)]);
    assert_eq!(c1.new_mode, c2.new_mode);
    assert_eq!((c1.x, c1.y), (c2.x, c2.y));
}

#[test]
fn clone_attempts_are_undone_when_the_source_moves() {
    // Every branch with HDMI-1 on C1 dies because eDP-1 needs C1, including
    // the one where DP-1 shares it. HDMI-1 then moves to C2, which DP-1 cannot
    // share, so DP-1 ends up on C3 by itself.
    let topology = topology(
        &[1, 2, 3],
        vec![
            output(10, "HDMI-1", &[1, 2]),
            output(11, "DP-1", &[1, 3]),
            output(12, "eDP-1", &[1]),
        ],
    );
    let source = request(10, 0);
    let clone = OutputRequest::clone_of(OutputId(11), &source);
    let other = request(12, 1920);

    let allocation = allocate(&[source, clone, other], &topology).unwrap();

    let outputs_of = |id| {
        let crtc = allocation.crtcs.iter().find(|c| c.id == CrtcId(id)).unwrap();
        crtc.outputs.clone()
    };
    assert_eq!(outputs_of(2), vec![OutputId(10)]);
    assert_eq!(outputs_of(3), vec![OutputId(11)]);
    assert_eq!(outputs_of(1), vec![OutputId(12)]);
}

#[test]
fn backtracks_when_greedy_choice_blocks_later_output() {
    let topology = topology(
        &[1, 2],
        vec![output(10, "A", &[1, 2]), output(11, "B", &[1])],
    );

    let allocation = allocate(&[request(10, 0), request(11, 1920)], &topology).unwrap();

    assert_eq!(driving_crtc(&allocation, 10), CrtcId(2));
    assert_eq!(driving_crtc(&allocation, 11), CrtcId(1));
}

#[test]
fn unused_crtcs_are_disabled() {
    let topology = topology(&[1, 2, 3], vec![output(10, "HDMI-1", &[2])]);

    let allocation = allocate(&[request(10, 0)], &topology).unwrap();

    let ids: Vec<_> = allocation.crtcs.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![CrtcId(2), CrtcId(1), CrtcId(3)]);
    assert_eq!(allocation.crtcs[1], CrtcConfiguration::disabled(CrtcId(1)));
    assert_eq!(allocation.crtcs[2], CrtcConfiguration::disabled(CrtcId(3)));
}

#[test]
fn no_requests_disable_everything() {
    let topology = topology(&[1, 2], vec![output(10, "HDMI-1", &[1])]);

    let allocation = allocate(&[], &topology).unwrap();

    assert!(allocation.outputs.is_empty());
    assert!(allocation.crtcs.iter().all(CrtcConfiguration::is_disabled));
    assert_eq!(allocation.crtcs.len(), 2);
}

#[test]
fn disabled_request_takes_no_crtc_and_is_not_primary() {
    let topology = topology(
        &[1],
        vec![output(10, "HDMI-1", &[1]), output(11, "DP-1", &[1])],
    );

    let requests = [OutputRequest::disabled(OutputId(10)), request(11, 0)];
    let allocation = allocate(&requests, &topology).unwrap();

    assert!(allocation.crtc_for(OutputId(10)).is_none());
    assert_eq!(driving_crtc(&allocation, 11), CrtcId(1));
    assert!(allocation
        .outputs
        .iter()
        .all(|o| o.properties.primary != Some(true)));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn unknown_ids_are_reported_not_retried() {
    let topology = topology(&[1], vec![output(10, "HDMI-1", &[1, 5])]);

    assert_eq!(
        allocate(&[request(10, 0)], &topology),
        Err(AllocationError::UnknownCrtc(CrtcId(5)))
    );

    let topology = self::topology(&[1], vec![output(10, "HDMI-1", &[1])]);
    assert_eq!(
        allocate(&[request(12, 0)], &topology),
        Err(AllocationError::UnknownOutput(OutputId(12)))
    );
    assert_eq!(
        allocate(
            &[OutputRequest::enabled(OutputId(10), ModeId(9), 0, 0)],
            &topology
        ),
        Err(AllocationError::UnknownMode(ModeId(9)))
    );
}

#[test]
fn duplicate_requests_are_rejected() {
    let topology = topology(&[1, 2], vec![output(10, "HDMI-1", &[1, 2])]);

    assert_eq!(
        allocate(&[request(10, 0), request(10, 1920)], &topology),
        Err(AllocationError::DuplicateRequest(OutputId(10)))
    );
}

#[test]
fn clone_source_must_come_first() {
    let topology = topology(
        &[1, 2],
        vec![output(10, "HDMI-1", &[1]), output(11, "DP-1", &[2])],
    );
    let source = request(10, 0);
    let clone = OutputRequest::clone_of(OutputId(11), &source);

    assert_eq!(
        allocate(&[clone, source], &topology),
        Err(AllocationError::CloneSourceNotEarlier {
            output: OutputId(11),
            clone_of: OutputId(10),
        })
    );
}

#[test]
fn search_limit_is_distinct_from_infeasible() {
    let topology = topology(
        &[1, 2],
        vec![output(10, "A", &[1, 2]), output(11, "B", &[1])],
    );
    let requests = [request(10, 0), request(11, 1920)];

    let res = Allocator::new(&topology)
        .with_search_limit(2)
        .allocate(&requests);
    assert_eq!(res, Err(AllocationError::SearchLimitExceeded { limit: 2 }));

    // Backtracking once takes three attempts in total.
    assert!(Allocator::new(&topology)
        .with_search_limit(3)
        .allocate(&requests)
        .is_ok());
}

// =============================================================================
// Properties
// =============================================================================

#[derive(Debug, Clone)]
struct Case {
    topology: Topology,
    requests: Vec<OutputRequest>,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Enabled,
    Disabled,
    CloneOf(Index),
}

fn arbitrary_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        3 => Just(Kind::Enabled),
        1 => Just(Kind::Disabled),
        2 => any::<Index>().prop_map(Kind::CloneOf),
    ]
}

fn arbitrary_case() -> impl Strategy<Value = Case> {
    (1..=4usize, 1..=4usize)
        .prop_flat_map(|(n_crtcs, n_outputs)| {
            let crtc_ids: Vec<u32> = (1..=n_crtcs as u32).collect();
            let possible = prop::collection::vec(
                subsequence(crtc_ids, 1..=n_crtcs).prop_shuffle(),
                n_outputs,
            );
            let primary = prop::collection::vec(any::<bool>(), n_outputs);
            let order = Just((0..n_outputs).collect::<Vec<_>>()).prop_shuffle();
            let requested = 1..=n_outputs;
            let kinds = prop::collection::vec(arbitrary_kind(), n_outputs);
            (Just(n_crtcs), possible, primary, order, requested, kinds)
        })
        .prop_map(|(n_crtcs, possible, primary, order, requested, kinds)| {
            let crtcs: Vec<u32> = (1..=n_crtcs as u32).collect();
            let outputs = possible
                .iter()
                .zip(&primary)
                .enumerate()
                .map(|(i, (possible, &primary))| {
                    let mut o = output(10 + i as u32, &format!("OUT-{i}"), possible);
                    o.properties
                        .insert("primary".to_owned(), PropertyValue::Bool(primary));
                    o
                })
                .collect();

            let mut requests: Vec<OutputRequest> = Vec::new();
            for (k, &o) in order.iter().take(requested).enumerate() {
                let id = OutputId(10 + o as u32);
                let req = match kinds[k] {
                    Kind::Disabled => OutputRequest::disabled(id),
                    Kind::CloneOf(idx) if k > 0 => {
                        let source = &requests[idx.index(k)];
                        OutputRequest::clone_of(id, source)
                    }
                    _ => OutputRequest::enabled(id, ModeId(1), k as i32 * 1920, 0),
                };
                requests.push(req);
            }

            Case {
                topology: topology(&crtcs, outputs),
                requests,
            }
        })
}

/// Whether some assignment of CRTCs exists, by exhaustive enumeration.
///
/// A request may land on a CRTC already used by an earlier request only if it
/// clones an output on that same CRTC.
fn feasible_by_enumeration(case: &Case) -> bool {
    let enabled: Vec<&OutputRequest> = case.requests.iter().filter(|r| r.is_enabled()).collect();
    let choices: Vec<&[CrtcId]> = enabled
        .iter()
        .map(|r| &*case.topology.output(r.output).unwrap().possible_crtcs)
        .collect();

    let mut pick = vec![0; enabled.len()];
    loop {
        let assigned: Vec<CrtcId> = pick.iter().zip(&choices).map(|(&i, c)| c[i]).collect();

        let valid = (0..enabled.len()).all(|r| {
            let shared = (0..r).any(|s| assigned[s] == assigned[r]);
            if !shared {
                return true;
            }
            let Some(source) = enabled[r].clone_of else {
                return false;
            };
            (0..r).any(|s| enabled[s].output == source && assigned[s] == assigned[r])
        });
        if valid {
            return true;
        }

        // Next combination, odometer style.
        let mut digit = 0;
        loop {
            if digit == pick.len() {
                return false;
            }
            pick[digit] += 1;
            if pick[digit] < choices[digit].len() {
                break;
            }
            pick[digit] = 0;
            digit += 1;
        }
    }
}

fn check_allocation(case: &Case, allocation: &Allocation) {
    let topology = &case.topology;

    // Every CRTC exactly once.
    let mut ids: Vec<_> = allocation.crtcs.iter().map(|c| c.id).collect();
    ids.sort();
    let mut expected: Vec<_> = topology.crtcs.iter().map(|c| c.id).collect();
    expected.sort();
    assert_eq!(ids, expected);

    for crtc in &allocation.crtcs {
        if crtc.is_disabled() {
            assert_eq!(crtc, &CrtcConfiguration::disabled(crtc.id));
        } else {
            assert!(!crtc.outputs.is_empty());
        }
    }

    // Enabled outputs on exactly one legal CRTC, disabled ones on none.
    for request in &case.requests {
        let driving: Vec<_> = allocation
            .crtcs
            .iter()
            .filter(|c| c.outputs.contains(&request.output))
            .collect();

        if request.is_enabled() {
            assert_eq!(driving.len(), 1);
            let possible = &topology.output(request.output).unwrap().possible_crtcs;
            assert!(possible.contains(&driving[0].id));
            assert_eq!(driving[0].new_mode, request.mode);
            assert_eq!((driving[0].x, driving[0].y), (request.x, request.y));
        } else {
            assert!(driving.is_empty());
        }
    }

    // One output configuration per request, in order.
    let outputs: Vec<_> = allocation.outputs.iter().map(|o| o.id).collect();
    let requested: Vec<_> = case.requests.iter().map(|r| r.output).collect();
    assert_eq!(outputs, requested);

    // At most one primary, and only the first request.
    let primaries: Vec<_> = allocation
        .outputs
        .iter()
        .filter(|o| o.properties.primary == Some(true))
        .collect();
    assert!(primaries.len() <= 1);
    if let Some(primary) = primaries.first() {
        assert_eq!(primary.id, case.requests[0].output);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        ..ProptestConfig::default()
    })]

    #[test]
    fn random_allocations_hold_invariants(case in arbitrary_case()) {
        let res = allocate(&case.requests, &case.topology);

        match &res {
            Ok(allocation) => check_allocation(&case, allocation),
            Err(err) => {
                prop_assert!(
                    matches!(err, AllocationError::Infeasible(_)),
                    "unexpected error: {err:?}"
                );
            }
        }

        prop_assert_eq!(res.is_ok(), feasible_by_enumeration(&case));

        // No hidden state between calls.
        prop_assert_eq!(allocate(&case.requests, &case.topology), res);
    }
}
