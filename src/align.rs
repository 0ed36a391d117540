/// Pads a requested payload size so that header plus payload together land
/// on an alignment boundary.
///
/// Grows `$size` by the smallest amount that makes `$size + $header` a
/// multiple of `$width`.
///
/// # Examples
///
/// ```rust
/// use brkalloc::pad_to;
///
/// assert_eq!(pad_to!(312usize, 32, 16), 320);
/// assert_eq!(pad_to!(48usize, 32, 16), 48);
/// ```
#[macro_export]
macro_rules! pad_to {
  ($size:expr, $header:expr, $width:expr) => {
    $size + ($width - ($size + $header) % $width) % $width
  };
}

/// Rounds a length up to the next multiple of a page size. Lengths already
/// on a page boundary are returned unchanged.
///
/// # Examples
///
/// ```rust
/// use brkalloc::round_to;
///
/// assert_eq!(round_to!(1usize, 4096), 4096);
/// assert_eq!(round_to!(8192usize, 4096), 8192);
/// ```
#[macro_export]
macro_rules! round_to {
  ($len:expr, $page:expr) => {
    match $len % $page {
      0 => $len,
      partial => $len + ($page - partial),
    }
  };
}
