pub type Pounds = f32;
pub type Percent = f32;
pub type PoundsPerSecond = f32;
pub type Seconds = f32;
