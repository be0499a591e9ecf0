//! Built-in page templates.

/// Layout wrapping every page.
pub const BASE: &str = "base";
/// Home page.
pub const INDEX: &str = "index";
/// Login form.
pub const LOGIN: &str = "login";
/// Driver list.
pub const DRIVER_LIST: &str = "driver_list";
/// Car list.
pub const CAR_LIST: &str = "car_list";
/// Manufacturer list.
pub const MANUFACTURER_LIST: &str = "manufacturer_list";
/// Driver detail.
pub const DRIVER_DETAIL: &str = "driver_detail";
/// Car detail.
pub const CAR_DETAIL: &str = "car_detail";

/// Layout variable receiving the rendered page.
pub const CONTENT: &str = "content";

/// Template names and sources.
pub const BUILTIN: &[(&str, &str)] = &[
    (BASE, include_str!("../../templates/base.html")),
    (INDEX, include_str!("../../templates/index.html")),
    (LOGIN, include_str!("../../templates/login.html")),
    (DRIVER_LIST, include_str!("../../templates/driver_list.html")),
    (CAR_LIST, include_str!("../../templates/car_list.html")),
    (MANUFACTURER_LIST, include_str!("../../templates/manufacturer_list.html")),
    (DRIVER_DETAIL, include_str!("../../templates/driver_detail.html")),
    (CAR_DETAIL, include_str!("../../templates/car_detail.html")),
];
