// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Extra asserts to make tests shorter / more readable.

#[macro_export]
macro_rules! assert_err {
  ($res:expr, $pattern:pat) => {{
    match $res {
      Err($pattern) => {}
      Err(e) => panic!("Unexpected error variant:\n{e:?}"),
      Ok(_) => panic!("Unexpected `Ok`."),
    }
  }};
}

/// Checks a set of groups contains exactly the expected (still, motion,
/// confidence) triples, in any order.
#[macro_export]
macro_rules! assert_groups {
  ($groups:expr, [$(($still:literal, $motion:literal, $confidence:expr)),* $(,)?]) => {{
    let actual = $groups
      .iter()
      .map(|g| (g.still.clone(), g.motion.clone(), g.confidence()))
      .collect::<std::collections::HashSet<_>>();
    let expected = std::collections::HashSet::from([
      $(($still.to_string(), $motion.to_string(), Some($confidence))),*
    ]);

    assert!(
      actual == expected,
      "Groups do not match:\nActual:   {actual:#?}\nExpected: {expected:#?}"
    );
  }};
}

/// Checks that `f` leaves the modification time and contents of `path`
/// untouched.
#[macro_export]
macro_rules! assert_untouched {
  ($path:expr, $f:expr) => {{
    let path = $path;
    // Backdate so a rewrite within the same clock tick is still detected.
    filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
    let before = std::fs::metadata(&path).unwrap().modified().unwrap();
    let bytes = std::fs::read(&path).unwrap();

    $f;

    let after = std::fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(before, after, "{}: Modification time changed.", path.display());
    assert_eq!(bytes, std::fs::read(&path).unwrap(), "{}: Contents changed.", path.display());
  }};
}
