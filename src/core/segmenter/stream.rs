use futures::{Stream, StreamExt};

use super::machine::{Segmenter, SegmenterConfig, Utterance};

/// Adapt a fragment stream into a lazy utterance stream.
///
/// Fragments are pulled only when the consumer asks for the next utterance
/// and the current fragment produced nothing more. An upstream error ends
/// the stream after being yielded; buffered text is not flushed in that case.
pub fn segment_stream<S, E>(
    fragments: S,
    config: SegmenterConfig,
) -> impl Stream<Item = Result<Utterance, E>>
where
    S: Stream<Item = Result<String, E>>,
{
    async_stream::try_stream! {
        let mut segmenter = Segmenter::new(config);
        futures::pin_mut!(fragments);

        while let Some(fragment) = fragments.next().await {
            let fragment: String = fragment?;
            for utterance in segmenter.push(&fragment) {
                yield utterance;
            }
        }

        if let Some(utterance) = segmenter.finish() {
            yield utterance;
        }
    }
}
