use crate::error::AllocationError;
use crate::random::{RandomCode, ALPHANUMERIC};
use crate::words::WordPair;
use crate::Generator;
use parcel_core::{CodeLookup, CodeStyle, ShortCode};
use std::sync::Arc;
use tracing::{trace, warn};
use typed_builder::TypedBuilder;

/// Tuning for [`ShortCodeAllocator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct AllocatorSettings {
    /// Alphabet for random codes.
    #[builder(default = ALPHANUMERIC.to_string(), setter(into))]
    pub alphabet: String,
    /// Length of regular random codes.
    #[builder(default = 8)]
    pub code_length: usize,
    /// Length of the codes used once regular attempts are exhausted.
    #[builder(default = 16)]
    pub fallback_length: usize,
    /// Candidates tried per phase before giving up on it.
    #[builder(default = 10)]
    pub max_attempts: usize,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Allocates short codes that are not yet taken in one namespace.
///
/// The allocator is bound to a single [`CodeLookup`] (the content table or
/// the link table), so a code is only ever checked against its own
/// namespace. Allocation runs in two phases:
///
/// 1. up to `max_attempts` candidates in the caller's preferred style;
/// 2. up to `max_attempts` long random codes, each still checked.
///
/// The existence check is only a pre-filter. Two concurrent callers can be
/// handed the same code, so the insert that follows must rely on the
/// store's uniqueness constraint and ask for a fresh code on conflict.
pub struct ShortCodeAllocator<L: ?Sized, R = RandomCode, W = WordPair> {
    lookup: Arc<L>,
    random: R,
    words: W,
    fallback: RandomCode,
    max_attempts: usize,
}

impl<L: CodeLookup + ?Sized> ShortCodeAllocator<L> {
    pub fn new(lookup: Arc<L>, settings: &AllocatorSettings) -> Result<Self, AllocationError> {
        let random = RandomCode::new(&settings.alphabet, settings.code_length)?;
        let fallback = RandomCode::new(&settings.alphabet, settings.fallback_length)?;
        if settings.fallback_length <= settings.code_length {
            return Err(AllocationError::InvalidSettings(format!(
                "fallback length {} must exceed code length {}",
                settings.fallback_length, settings.code_length
            )));
        }

        Ok(Self::with_generators(
            lookup,
            random,
            WordPair::new(),
            fallback,
            settings.max_attempts,
        ))
    }
}

impl<L, R, W> ShortCodeAllocator<L, R, W>
where
    L: CodeLookup + ?Sized,
    R: Generator,
    W: Generator,
{
    pub fn with_generators(
        lookup: Arc<L>,
        random: R,
        words: W,
        fallback: RandomCode,
        max_attempts: usize,
    ) -> Self {
        Self {
            lookup,
            random,
            words,
            fallback,
            max_attempts: max_attempts.max(1),
        }
    }

    fn candidate(&self, style: CodeStyle) -> ShortCode {
        match style {
            CodeStyle::Random => self.random.generate().into(),
            CodeStyle::WordPair => self.words.generate().into(),
        }
    }

    /// Returns a code that was free in this namespace at the time of the
    /// check.
    pub async fn allocate(&self, style: CodeStyle) -> Result<ShortCode, AllocationError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate(style);
            if !self.lookup.code_exists(&candidate).await? {
                return Ok(candidate);
            }
            trace!(attempt, code = %candidate, ?style, "short code collision");
        }

        warn!(
            attempts = self.max_attempts,
            ?style,
            length = self.fallback.length(),
            "short code attempts exhausted, falling back to long codes"
        );

        for _ in 0..self.max_attempts {
            let candidate = self.fallback.generate();
            if !self.lookup.code_exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(AllocationError::Exhausted {
            attempts: self.max_attempts * 2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::SeqGenerator;
    use async_trait::async_trait;
    use parcel_core::StorageError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TakenCodes {
        codes: Mutex<HashSet<String>>,
        lookups: AtomicUsize,
    }

    impl TakenCodes {
        fn with(codes: &[&str]) -> Self {
            let taken = Self::default();
            for code in codes {
                taken.take(code);
            }
            taken
        }

        fn take(&self, code: &str) -> bool {
            self.codes.lock().unwrap().insert(code.to_string())
        }
    }

    #[async_trait]
    impl CodeLookup for TakenCodes {
        async fn code_exists(&self, code: &ShortCode) -> parcel_core::error::Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.codes.lock().unwrap().contains(code.as_str()))
        }
    }

    /// Treats every code of one length as taken.
    struct LengthTaken(usize);

    #[async_trait]
    impl CodeLookup for LengthTaken {
        async fn code_exists(&self, code: &ShortCode) -> parcel_core::error::Result<bool> {
            Ok(code.len() == self.0)
        }
    }

    struct AllTaken;

    #[async_trait]
    impl CodeLookup for AllTaken {
        async fn code_exists(&self, _code: &ShortCode) -> parcel_core::error::Result<bool> {
            Ok(true)
        }
    }

    struct Broken;

    #[async_trait]
    impl CodeLookup for Broken {
        async fn code_exists(&self, _code: &ShortCode) -> parcel_core::error::Result<bool> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }
    }

    fn fallback() -> RandomCode {
        RandomCode::new(ALPHANUMERIC, 16).unwrap()
    }

    #[tokio::test]
    async fn retries_past_taken_codes() {
        let taken = Arc::new(TakenCodes::with(&["pc000000", "pc000001", "pc000002"]));
        let allocator = ShortCodeAllocator::with_generators(
            Arc::clone(&taken),
            SeqGenerator::with_prefix("pc"),
            WordPair::new(),
            fallback(),
            10,
        );

        let code = allocator.allocate(CodeStyle::Random).await.unwrap();

        assert_eq!(code.as_str(), "pc000003");
        assert_eq!(taken.lookups.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn falls_back_to_long_code_after_bounded_attempts() {
        let allocator =
            ShortCodeAllocator::new(Arc::new(LengthTaken(8)), &AllocatorSettings::default())
                .unwrap();

        let code = allocator.allocate(CodeStyle::Random).await.unwrap();

        assert_eq!(code.len(), 16);
        assert!(ShortCode::new(code.as_str()).is_ok());
    }

    #[tokio::test]
    async fn word_style_also_falls_back_to_long_random_code() {
        let taken = Arc::new(TakenCodes::with(&["word000000", "word000001", "word000002"]));
        let allocator = ShortCodeAllocator::with_generators(
            Arc::clone(&taken),
            SeqGenerator::with_prefix("unused"),
            SeqGenerator::with_prefix("word"),
            fallback(),
            3,
        );

        let code = allocator.allocate(CodeStyle::WordPair).await.unwrap();

        assert_eq!(code.len(), 16);
        assert!(!code.as_str().starts_with("unused"));
    }

    #[tokio::test]
    async fn reports_exhaustion_when_everything_is_taken() {
        let allocator =
            ShortCodeAllocator::new(Arc::new(AllTaken), &AllocatorSettings::default()).unwrap();

        let err = allocator.allocate(CodeStyle::Random).await.unwrap_err();

        assert!(matches!(err, AllocationError::Exhausted { attempts: 20 }));
    }

    #[tokio::test]
    async fn lookup_failures_propagate() {
        let allocator =
            ShortCodeAllocator::new(Arc::new(Broken), &AllocatorSettings::default()).unwrap();

        let err = allocator.allocate(CodeStyle::Random).await.unwrap_err();

        assert!(matches!(err, AllocationError::Lookup(_)));
    }

    #[tokio::test]
    async fn namespaces_are_checked_independently() {
        let content_codes = Arc::new(TakenCodes::with(&["pc000000"]));
        let link_codes = Arc::new(TakenCodes::default());

        let link_allocator = ShortCodeAllocator::with_generators(
            Arc::clone(&link_codes),
            SeqGenerator::with_prefix("pc"),
            WordPair::new(),
            fallback(),
            10,
        );

        // taken as a content code, still free as a link code
        let code = link_allocator.allocate(CodeStyle::Random).await.unwrap();
        assert_eq!(code.as_str(), "pc000000");
        assert_eq!(content_codes.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejects_fallback_not_longer_than_code() {
        let settings = AllocatorSettings::builder()
            .code_length(16)
            .fallback_length(16)
            .build();
        assert!(matches!(
            ShortCodeAllocator::new(Arc::new(AllTaken), &settings),
            Err(AllocationError::InvalidSettings(_))
        ));
    }

    #[tokio::test]
    async fn ten_thousand_allocations_are_pairwise_distinct() {
        let taken = Arc::new(TakenCodes::default());
        // 3^8 = 6561 regular codes, so most of the run collides and
        // exercises both the retry loop and the long-code fallback
        let settings = AllocatorSettings::builder()
            .alphabet("abc")
            .code_length(8)
            .fallback_length(16)
            .build();
        let allocator = ShortCodeAllocator::new(Arc::clone(&taken), &settings).unwrap();

        for _ in 0..10_000 {
            let code = allocator.allocate(CodeStyle::Random).await.unwrap();
            assert!(taken.take(code.as_str()), "duplicate code {code}");
        }

        assert_eq!(taken.codes.lock().unwrap().len(), 10_000);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Whatever is already taken, the allocated code is not.
            #[test]
            fn allocated_code_is_never_pre_taken(
                taken in prop::collection::hash_set("[ab]{4}", 0..8),
                word_style in any::<bool>(),
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                let lookup = Arc::new(TakenCodes::default());
                for code in &taken {
                    lookup.take(code);
                }
                let settings = AllocatorSettings::builder()
                    .alphabet("ab")
                    .code_length(4)
                    .fallback_length(16)
                    .build();
                let allocator = ShortCodeAllocator::new(Arc::clone(&lookup), &settings).unwrap();

                let code = runtime
                    .block_on(allocator.allocate(CodeStyle::from_preference(word_style)))
                    .unwrap();

                prop_assert!(!taken.contains(code.as_str()));
            }
        }
    }
}
