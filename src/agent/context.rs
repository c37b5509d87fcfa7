/// Operating regime of the environment. Each context keeps its own exploration
/// rate, and the actuator maps actions differently per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum OperatingContext {
    #[default]
    Cube,
    Ship,
    Ball,
    Ufo,
    Wave,
    Robot,
    Spider,
    Swing,
}

impl OperatingContext {
    /// Number of contexts.
    pub const COUNT: usize = 8;

    pub const ALL: [OperatingContext; Self::COUNT] = [
        OperatingContext::Cube,
        OperatingContext::Ship,
        OperatingContext::Ball,
        OperatingContext::Ufo,
        OperatingContext::Wave,
        OperatingContext::Robot,
        OperatingContext::Spider,
        OperatingContext::Swing,
    ];

    /// Get context index (0-7).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Value written into the state vector's context slot.
    pub fn tag(&self) -> f32 {
        self.index() as f32 / Self::COUNT as f32
    }
}

impl std::fmt::Display for OperatingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperatingContext::Cube => "Cube",
            OperatingContext::Ship => "Ship",
            OperatingContext::Ball => "Ball",
            OperatingContext::Ufo => "UFO",
            OperatingContext::Wave => "Wave",
            OperatingContext::Robot => "Robot",
            OperatingContext::Spider => "Spider",
            OperatingContext::Swing => "Swing",
        };
        f.write_str(name)
    }
}
