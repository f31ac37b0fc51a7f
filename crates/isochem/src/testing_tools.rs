macro_rules! assert_error_message {
    ($result:expr, $message:expr) => {
        assert_eq!($result.unwrap_err().to_string(), $message);
    };
}

macro_rules! assert_miette_labels {
    ($diag:expr, [$(($label:expr, $offset:expr, $length:expr)),* $(,)?]) => {{
        use miette::Diagnostic;

        let labels: Vec<_> = $diag
            .labels()
            .into_iter()
            .flatten()
            .map(|l| (l.label().map(str::to_owned), l.offset(), l.len()))
            .collect();
        let expected: Vec<(Option<String>, usize, usize)> =
            vec![$((Some($label.to_owned()), $offset, $length)),*];
        assert_eq!(labels, expected, "labels of {}", stringify!($diag));
    }};
}

pub(crate) use assert_error_message;
pub(crate) use assert_miette_labels;
