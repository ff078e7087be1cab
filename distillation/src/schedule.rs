use crate::{DistillErr, Result, config::ScheduleParams};

/// What trains during an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The teacher trains on the hard labels.
    TeacherOnly,
    /// The student trains against a frozen teacher.
    StudentOnly,
    /// Both train on the same batches, the teacher first.
    CoTrain,
    /// Nothing trains.
    Idle,
}

const TEACHER: &[Phase] = &[Phase::TeacherOnly];
const TEACHER_THEN_STUDENT: &[Phase] = &[Phase::TeacherOnly, Phase::StudentOnly];
const STUDENT: &[Phase] = &[Phase::StudentOnly];
const CO_TRAIN: &[Phase] = &[Phase::CoTrain];
const IDLE: &[Phase] = &[Phase::Idle];

/// Decides which phases run on each epoch. Epochs are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    params: ScheduleParams,
}

impl Schedule {
    /// Creates a new `Schedule`.
    ///
    /// # Returns
    /// A config error if any count is zero, the student would train more epochs than the
    /// teacher in sequential mode or would never start in co-train mode.
    pub fn new(params: ScheduleParams) -> Result<Self> {
        match params {
            ScheduleParams::Sequential {
                teacher_epochs,
                student_epochs,
            } => {
                if teacher_epochs == 0 || student_epochs == 0 {
                    return Err(DistillErr::Config(
                        "teacher_epochs and student_epochs must be at least 1".into(),
                    ));
                }

                if student_epochs > teacher_epochs {
                    return Err(DistillErr::Config(format!(
                        "student_epochs ({student_epochs}) can't exceed teacher_epochs ({teacher_epochs})"
                    )));
                }
            }
            ScheduleParams::CoTrain {
                epochs,
                student_start,
                student_step,
                ..
            } => {
                if epochs == 0 || student_start == 0 || student_step == 0 {
                    return Err(DistillErr::Config(
                        "epochs, student_start and student_step must be at least 1".into(),
                    ));
                }

                if student_start > epochs {
                    return Err(DistillErr::Config(format!(
                        "student_start ({student_start}) is past the last epoch ({epochs})"
                    )));
                }
            }
        }

        Ok(Self { params })
    }

    pub fn total_epochs(&self) -> usize {
        match self.params {
            ScheduleParams::Sequential { teacher_epochs, .. } => teacher_epochs,
            ScheduleParams::CoTrain { epochs, .. } => epochs,
        }
    }

    /// Whether the teacher ever trains under this schedule.
    pub fn trains_teacher(&self) -> bool {
        !matches!(
            self.params,
            ScheduleParams::CoTrain {
                freeze_teacher: true,
                ..
            }
        )
    }

    /// Returns the phases of the given epoch, in the order they run.
    pub fn phases(&self, epoch: usize) -> &'static [Phase] {
        match self.params {
            ScheduleParams::Sequential { .. } => {
                if self.student_trains(epoch) {
                    TEACHER_THEN_STUDENT
                } else {
                    TEACHER
                }
            }
            ScheduleParams::CoTrain { freeze_teacher, .. } => {
                match (self.student_trains(epoch), freeze_teacher) {
                    (true, false) => CO_TRAIN,
                    (true, true) => STUDENT,
                    (false, false) => TEACHER,
                    (false, true) => IDLE,
                }
            }
        }
    }

    /// Returns every epoch the student trains on.
    pub fn student_epochs(&self) -> Vec<usize> {
        (1..=self.total_epochs())
            .filter(|&epoch| self.student_trains(epoch))
            .collect()
    }

    fn student_trains(&self, epoch: usize) -> bool {
        match self.params {
            ScheduleParams::Sequential {
                teacher_epochs,
                student_epochs,
            } => {
                let ratio = (teacher_epochs / student_epochs).max(1);
                epoch % ratio == 0
            }
            ScheduleParams::CoTrain {
                student_start,
                student_step,
                ..
            } => epoch >= student_start && (epoch - student_start) % student_step == 0,
        }
    }
}
