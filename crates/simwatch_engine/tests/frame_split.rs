use proptest::prelude::*;
use simwatch_engine::{interpret_frame, FrameDecoder, StatusUpdate};

fn stream_of(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "{{\"status\": {:.2}, \"message\": \"step {i} Température\"}}\n",
                i as f64 / count as f64
            )
        })
        .collect()
}

fn decode_in_pieces(bytes: &[u8], cuts: &[usize]) -> Vec<StatusUpdate> {
    let mut decoder = FrameDecoder::new();
    let mut updates = Vec::new();
    let mut start = 0;
    for &cut in cuts.iter().chain(std::iter::once(&bytes.len())) {
        let cut = cut.clamp(start, bytes.len());
        updates.extend(decoder.push_bytes(&bytes[start..cut]).iter().map(interpret_frame));
        start = cut;
    }
    updates
}

#[test]
fn byte_at_a_time_matches_whole_stream() {
    let stream = stream_of(5);
    let bytes = stream.as_bytes();
    let whole = decode_in_pieces(bytes, &[]);
    let cuts: Vec<usize> = (1..bytes.len()).collect();

    assert_eq!(whole.len(), 5);
    assert_eq!(decode_in_pieces(bytes, &cuts), whole);
}

proptest! {
    #[test]
    fn any_partition_yields_the_same_records(
        count in 1usize..8,
        mut cuts in prop::collection::vec(0usize..2_000, 0..12),
    ) {
        let stream = stream_of(count);
        let bytes = stream.as_bytes();
        cuts.sort_unstable();

        let whole = decode_in_pieces(bytes, &[]);
        prop_assert_eq!(whole.len(), count);
        prop_assert_eq!(decode_in_pieces(bytes, &cuts), whole);
    }
}
