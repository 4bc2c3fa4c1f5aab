#![warn(missing_docs)]
//! Module for uom macros that facilitate the creation of single lengths, `Point2` lengths or vecs of lengths
/// helper macro to create the units
#[macro_export]
macro_rules! length_creator {
    ($unit:ident, $val1:expr) => {
        uom::si::f64::Length::new::<$unit>($val1)
    };
    ($unit:ident, $val1:expr, $val2:expr) => {{
        use nalgebra::Point2;
        Point2::new(
            uom::si::f64::Length::new::<$unit>($val1),
            uom::si::f64::Length::new::<$unit>($val2),
        )
    }};
    ($unit:ident, $( $x:expr ),*) => {{
        vec![$( uom::si::f64::Length::new::<$unit>($x) ),*]
    }};
}

///macro to create a Length in meter
#[macro_export]
macro_rules! meter {
    ($( $x:expr ),*) =>{{
        use uom::si::length::meter;
        $crate::length_creator![meter, $( $x ),*]
    }};
}
///macro to create a Length in millimeter
#[macro_export]
macro_rules! millimeter {
    ($( $x:expr ),*) =>{{
        use uom::si::length::millimeter;
        $crate::length_creator![millimeter, $( $x ),*]
    }};
}
///macro to create a Length in micrometer
#[macro_export]
macro_rules! micrometer {
    ($( $x:expr ),*) =>{{
        use uom::si::length::micrometer;
        $crate::length_creator![micrometer, $( $x ),*]
    }};
}
///macro to create a Length in nanometer
#[macro_export]
macro_rules! nanometer {
    ($( $x:expr ),*) =>{{
        use uom::si::length::nanometer;
        $crate::length_creator![nanometer, $( $x ),*]
    }};
}
