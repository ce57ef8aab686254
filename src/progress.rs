//! Отслеживание прогресса рендера
//!
//! Наблюдатели подписываются на репортер, трекер пересчитывает общий
//! прогресс по весам этапов и рассылает `ProgressInfo`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Снимок прогресса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап
    pub step: String,
    /// Прогресс этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий прогресс рендера (0.0 - 100.0)
    pub total_progress: f32,
    pub details: Option<String>,
}

impl ProgressInfo {
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Наблюдатель, получающий обновления прогресса
pub trait ProgressObserver: Send + Sync {
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Источник уведомлений о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя, вернуть его идентификатор
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    fn notify_progress(&self, progress: ProgressInfo);
}

/// Репортер, синхронно вызывающий всех наблюдателей
pub struct DefaultProgressReporter {
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, observer);
        id
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        let observers = self.observers.read().unwrap_or_else(PoisonError::into_inner);
        for observer in observers.values() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Этапы рендера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderStep {
    /// Проверка входных данных, озвучка и субтитры
    Preparation,
    /// Поиск и нормализация изображений
    Normalization,
    /// Распределение времени и согласование с озвучкой
    Timeline,
    /// Субтитры и водяной знак
    Overlays,
    /// Кодирование итогового файла
    Encoding,
}

impl RenderStep {
    pub const ALL: [RenderStep; 5] = [
        Self::Preparation,
        Self::Normalization,
        Self::Timeline,
        Self::Overlays,
        Self::Encoding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparation => "Подготовка",
            Self::Normalization => "Нормализация изображений",
            Self::Timeline => "Сборка видеоряда",
            Self::Overlays => "Наложение текста",
            Self::Encoding => "Кодирование видео",
        }
    }

    /// Вес этапа в процентах от всего рендера
    pub fn weight(&self) -> f32 {
        match self {
            Self::Preparation => 5.0,
            Self::Normalization => 25.0,
            Self::Timeline => 5.0,
            Self::Overlays => 5.0,
            Self::Encoding => 60.0,
        }
    }
}

/// Трекер прогресса одного рендера.
///
/// Репортер разделяется между трекерами, состояние этапов у каждого своё.
pub struct ProgressTracker {
    reporter: Option<Arc<dyn ProgressReporter>>,
    current_step: RwLock<RenderStep>,
    step_progress: RwLock<f32>,
    completed_steps: RwLock<HashMap<RenderStep, f32>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            reporter: None,
            current_step: RwLock::new(RenderStep::Preparation),
            step_progress: RwLock::new(0.0),
            completed_steps: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        let mut tracker = Self::new();
        tracker.reporter = Some(Arc::from(reporter));
        tracker
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.reporter = Some(Arc::from(reporter));
    }

    /// Новый трекер с тем же репортером и чистым состоянием
    pub fn fork(&self) -> Self {
        Self {
            reporter: self.reporter.clone(),
            ..Self::new()
        }
    }

    /// Добавить наблюдателя.
    ///
    /// Вернёт `None`, если репортера нет или он занят трекером идущего рендера.
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> Option<usize> {
        self.reporter
            .as_mut()
            .and_then(Arc::get_mut)
            .map(|reporter| reporter.add_observer(observer))
    }

    /// Перейти к этапу; предыдущий считается завершённым
    pub fn set_step(&self, step: RenderStep) {
        {
            let mut current = self.current_step.write().unwrap_or_else(PoisonError::into_inner);
            if *current == step {
                return;
            }
            self.completed_steps
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(*current, 100.0);
            *current = step;
        }
        *self.step_progress.write().unwrap_or_else(PoisonError::into_inner) = 0.0;
        self.report_progress(None);
    }

    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        *self.step_progress.write().unwrap_or_else(PoisonError::into_inner) = progress.clamp(0.0, 100.0);
        self.report_progress(details);
    }

    /// Общий прогресс по весам всех этапов
    pub fn total_progress(&self) -> f32 {
        let completed = self.completed_steps.read().unwrap_or_else(PoisonError::into_inner);
        let current = *self.current_step.read().unwrap_or_else(PoisonError::into_inner);
        let step_progress = *self.step_progress.read().unwrap_or_else(PoisonError::into_inner);

        let total_weight: f32 = RenderStep::ALL.iter().map(RenderStep::weight).sum();
        let mut done: f32 = completed
            .iter()
            .filter(|(step, _)| **step != current)
            .map(|(step, progress)| step.weight() * progress / 100.0)
            .sum();
        done += current.weight() * step_progress / 100.0;

        (done / total_weight * 100.0).clamp(0.0, 100.0)
    }

    fn report_progress(&self, details: Option<String>) {
        if let Some(reporter) = &self.reporter {
            let step = *self.current_step.read().unwrap_or_else(PoisonError::into_inner);
            let step_progress = *self.step_progress.read().unwrap_or_else(PoisonError::into_inner);
            reporter.notify_progress(ProgressInfo::new(
                step.as_str(),
                step_progress,
                self.total_progress(),
                details,
            ));
        }
    }

    /// Отметить рендер завершённым
    pub fn complete(&self) {
        for step in RenderStep::ALL {
            self.completed_steps
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(step, 100.0);
        }
        *self.step_progress.write().unwrap_or_else(PoisonError::into_inner) = 100.0;
        self.report_progress(Some("Рендер завершён".to_string()));
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct TestObserver {
        updates: Arc<Mutex<Vec<ProgressInfo>>>,
    }

    impl TestObserver {
        fn new() -> (Self, Arc<Mutex<Vec<ProgressInfo>>>) {
            let updates = Arc::new(Mutex::new(Vec::new()));
            (Self { updates: updates.clone() }, updates)
        }
    }

    impl ProgressObserver for TestObserver {
        fn on_progress_update(&self, progress: ProgressInfo) {
            self.updates.lock().unwrap().push(progress);
        }
    }

    #[test]
    fn test_weights_sum_to_hundred() {
        let total: f32 = RenderStep::ALL.iter().map(RenderStep::weight).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_progress_tracker() {
        let mut reporter = DefaultProgressReporter::new();
        let (observer, updates) = TestObserver::new();
        reporter.add_observer(Box::new(observer));
        let tracker = ProgressTracker::with_reporter(Box::new(reporter));

        tracker.update_step_progress(50.0, None);
        {
            let updates = updates.lock().unwrap();
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].step, RenderStep::Preparation.as_str());
            assert_eq!(updates[0].step_progress, 50.0);
            assert!((updates[0].total_progress - 2.5).abs() < 1e-4);
        }

        tracker.set_step(RenderStep::Normalization);
        {
            let updates = updates.lock().unwrap();
            assert_eq!(updates.len(), 2);
            assert_eq!(updates[1].step, RenderStep::Normalization.as_str());
            assert_eq!(updates[1].step_progress, 0.0);
            assert!((updates[1].total_progress - 5.0).abs() < 1e-4);
        }

        // Повторная установка того же этапа ничего не рассылает
        tracker.set_step(RenderStep::Normalization);
        assert_eq!(updates.lock().unwrap().len(), 2);

        tracker.complete();
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].total_progress, 100.0);
        assert_eq!(updates[2].details, Some("Рендер завершён".to_string()));
    }

    #[test]
    fn test_remove_observer() {
        let mut reporter = DefaultProgressReporter::new();
        let (observer, updates) = TestObserver::new();
        let id = reporter.add_observer(Box::new(observer));
        assert!(reporter.remove_observer(id).is_some());
        reporter.notify_progress(ProgressInfo::new("x", 1.0, 1.0, None));
        assert!(updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fork_starts_from_zero_and_shares_observers() {
        let mut reporter = DefaultProgressReporter::new();
        let (observer, updates) = TestObserver::new();
        reporter.add_observer(Box::new(observer));
        let base = ProgressTracker::with_reporter(Box::new(reporter));

        let first = base.fork();
        first.set_step(RenderStep::Encoding);
        first.complete();
        assert_eq!(first.total_progress(), 100.0);

        let second = base.fork();
        assert_eq!(second.total_progress(), 0.0);
        second.update_step_progress(50.0, None);

        let updates = updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.step, RenderStep::Preparation.as_str());
        assert!((last.total_progress - 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_add_observer_while_forked() {
        let mut base = ProgressTracker::with_reporter(Box::new(DefaultProgressReporter::new()));
        let running = base.fork();
        let (observer, _) = TestObserver::new();
        assert_eq!(base.add_observer(Box::new(observer)), None);

        drop(running);
        let (observer, _) = TestObserver::new();
        assert!(base.add_observer(Box::new(observer)).is_some());
    }

    #[test]
    fn test_tracker_without_reporter() {
        let mut tracker = ProgressTracker::new();
        let (observer, _) = TestObserver::new();
        assert_eq!(tracker.add_observer(Box::new(observer)), None);
        tracker.update_step_progress(10.0, None);
    }
}
