//! Overlay lifecycle: wires the content store, renderer, layer placement,
//! drag handling and refresh scheduler together around one widget.
//!
//! Every method runs on the daemon's event loop thread. The settings change
//! listener never touches overlay state directly; it only posts an event that
//! the loop turns into [`Overlay::on_settings_changed`].

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::store::ChangeListener;
use crate::config::{Settings, SettingsStore, SubscriptionId};
use crate::content::{self, Entry};
use crate::drag::{DragController, PointerEvent, Propagation};
use crate::layer;
use crate::markup;
use crate::scheduler::{RefreshScheduler, TimerHandle};
use crate::style::WidgetStyle;
use crate::surface::{Indicator, Surface};

pub struct Overlay<S: Surface, C: SettingsStore> {
    store: C,
    surface: Option<S>,
    entries: Vec<Entry>,
    drag: Option<DragController>,
    scheduler: RefreshScheduler,
    refresh_timer: Option<TimerHandle>,
    subscription: Option<SubscriptionId>,
    indicator: Option<Box<dyn Indicator>>,
}

impl<S: Surface, C: SettingsStore> Overlay<S, C> {
    pub fn new(store: C) -> Self {
        Self {
            store,
            surface: None,
            entries: Vec::new(),
            drag: None,
            scheduler: RefreshScheduler::new(),
            refresh_timer: None,
            subscription: None,
            indicator: None,
        }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut C {
        &mut self.store
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.surface.is_some()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Bring the overlay up. On failure everything started so far is torn
    /// down again before the error is returned.
    pub fn start<F>(
        &mut self,
        content_path: &Path,
        build_surface: F,
        on_change: ChangeListener,
        now: Instant,
    ) -> Result<()>
    where
        F: FnOnce(&Settings) -> Result<S>,
    {
        match self.try_start(content_path, build_surface, on_change, now) {
            Ok(()) => {
                info!(entries = self.entries.len(), "Overlay started");
                Ok(())
            }
            Err(e) => {
                self.shutdown();
                Err(e)
            }
        }
    }

    fn try_start<F>(
        &mut self,
        content_path: &Path,
        build_surface: F,
        on_change: ChangeListener,
        now: Instant,
    ) -> Result<()>
    where
        F: FnOnce(&Settings) -> Result<S>,
    {
        let settings = self.store.snapshot();
        self.entries = content::load(content_path);

        let surface = build_surface(&settings).context("Failed to create overlay widget")?;
        let surface = self.surface.insert(surface);

        surface
            .apply_style(&WidgetStyle::from_settings(&settings))
            .context("Failed to apply widget style")?;
        self.drag = Some(DragController::new());
        layer::place(surface, settings.always_on_top)?;
        surface
            .set_position(settings.position())
            .context("Failed to set initial widget position")?;

        self.render_random(&settings)?;
        self.arm_timer(&settings, now);
        self.subscription = Some(self.store.subscribe(on_change));
        Ok(())
    }

    /// Full recompute from a fresh snapshot. Safe to call when nothing changed.
    ///
    /// Every step runs even if an earlier one fails; the first error is
    /// returned once the timer is re-armed.
    pub fn on_settings_changed(&mut self, now: Instant) -> Result<()> {
        let settings = self.store.snapshot();
        let Some(surface) = self.surface.as_mut() else {
            debug!("Settings changed before overlay started, ignoring");
            return Ok(());
        };

        let mut first_error = None;
        let mut note = |step: &str, result: Result<()>| {
            if let Err(e) = result {
                error!(step = step, error = ?e, "Failed to apply updated setting");
                first_error.get_or_insert(e);
            }
        };

        let style = WidgetStyle::from_settings(&settings);
        debug!(css = %style.to_css(), "Applying widget style");
        note(
            "style",
            surface.apply_style(&style).context("Failed to apply widget style"),
        );
        note(
            "position",
            surface
                .set_position(settings.position())
                .context("Failed to apply widget position"),
        );
        note("layer", layer::place(surface, settings.always_on_top));
        note("render", self.render_random(&settings));
        self.arm_timer(&settings, now);

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Applied updated settings");
                Ok(())
            }
        }
    }

    /// Show a new random entry immediately, leaving the timer alone
    pub fn refresh_now(&mut self) -> Result<()> {
        let settings = self.store.snapshot();
        self.render_random(&settings)
    }

    /// Drive the scheduler. Returns whether a refresh happened.
    pub fn on_tick(&mut self, now: Instant) -> Result<bool> {
        if !self.scheduler.poll(now) {
            return Ok(false);
        }
        debug!("Refresh timer fired");
        self.refresh_now()?;
        Ok(true)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<Propagation> {
        match (self.drag.as_mut(), self.surface.as_mut()) {
            (Some(drag), Some(surface)) => drag.handle(event, surface, &mut self.store),
            _ => Ok(Propagation::Propagate),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.as_ref().is_some_and(DragController::is_dragging)
    }

    pub fn attach_indicator(&mut self, indicator: Box<dyn Indicator>) {
        if let Some(mut previous) = self.indicator.replace(indicator) {
            warn!("Replacing an existing indicator");
            previous.release();
        }
    }

    /// Tear down in reverse dependency order. Repeated and partial calls are fine.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.refresh_timer.take() {
            self.scheduler.disarm(handle);
        }

        self.drag = None;
        if let Some(mut surface) = self.surface.take() {
            if let Err(e) = surface.detach() {
                error!(error = ?e, "Failed to detach widget during shutdown");
            }
            drop(surface);
            debug!("Widget released");
        }

        if let Some(mut indicator) = self.indicator.take() {
            indicator.release();
            debug!("Indicator released");
        }

        if let Some(id) = self.subscription.take() {
            self.store.unsubscribe(id);
            debug!("Settings subscription dropped");
        }

        if !self.entries.is_empty() {
            self.entries.clear();
            info!("Overlay shut down");
        }
    }

    fn render_random(&mut self, settings: &Settings) -> Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        let entry = content::pick_random(&self.entries);
        let document = markup::render(entry, settings);
        surface
            .set_markup(&document)
            .context("Failed to display hadith")?;
        debug!(has_entry = entry.is_some(), "Rendered entry");
        Ok(())
    }

    fn arm_timer(&mut self, settings: &Settings, now: Instant) {
        if let Some(handle) = self.refresh_timer.take() {
            self.scheduler.disarm(handle);
        }
        self.refresh_timer = Some(self.scheduler.arm(settings.refresh_interval, now));
    }
}

impl<S: Surface, C: SettingsStore> Drop for Overlay<S, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::testing::MemoryStore;
    use crate::surface::testing::RecordingSurface;
    use crate::surface::{ChromeOptions, CursorGlyph, Layer};
    use crate::types::Position;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Lets the test keep observing the widget after the overlay drops it
    struct SharedSurface(Rc<RefCell<RecordingSurface>>);

    impl Surface for SharedSurface {
        fn position(&self) -> Position {
            self.0.borrow().position()
        }
        fn set_position(&mut self, position: Position) -> Result<()> {
            self.0.borrow_mut().set_position(position)
        }
        fn apply_style(&mut self, style: &WidgetStyle) -> Result<()> {
            self.0.borrow_mut().apply_style(style)
        }
        fn set_markup(&mut self, markup: &str) -> Result<()> {
            self.0.borrow_mut().set_markup(markup)
        }
        fn set_cursor(&mut self, cursor: CursorGlyph) -> Result<()> {
            self.0.borrow_mut().set_cursor(cursor)
        }
        fn parent(&self) -> Option<Layer> {
            self.0.borrow().parent()
        }
        fn detach(&mut self) -> Result<()> {
            self.0.borrow_mut().detach()
        }
        fn untrack(&mut self) -> Result<()> {
            self.0.borrow_mut().untrack()
        }
        fn attach(&mut self, layer: Layer, options: ChromeOptions) -> Result<()> {
            self.0.borrow_mut().attach(layer, options)
        }
    }

    impl Drop for SharedSurface {
        fn drop(&mut self) {
            self.0.borrow_mut().calls.push("dropped");
        }
    }

    struct TestIndicator(Rc<RefCell<RecordingSurface>>);

    impl Indicator for TestIndicator {
        fn release(&mut self) {
            self.0.borrow_mut().calls.push("indicator_released");
        }
    }

    fn content_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();
        file
    }

    fn counter() -> (Arc<AtomicUsize>, ChangeListener) {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = calls.clone();
        (calls, Box::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn started(
        settings: Settings,
        json: &str,
    ) -> (Overlay<SharedSurface, MemoryStore>, Rc<RefCell<RecordingSurface>>, Instant) {
        let file = content_file(json);
        let widget = Rc::new(RefCell::new(RecordingSurface::default()));
        let handle = widget.clone();
        let mut overlay = Overlay::new(MemoryStore::with(settings));
        let now = Instant::now();
        let (_, listener) = counter();
        overlay
            .start(file.path(), move |_| Ok(SharedSurface(handle)), listener, now)
            .unwrap();
        (overlay, widget, now)
    }

    const ONE_ENTRY: &str = r#"[{"english": "Only entry"}]"#;

    #[test]
    fn test_start_order() {
        let settings = Settings {
            position_x: 30,
            position_y: 40,
            ..Default::default()
        };
        let (overlay, widget, now) = started(settings, ONE_ENTRY);
        let widget = widget.borrow();

        assert_eq!(
            widget.calls,
            vec!["apply_style", "untrack", "attach", "set_position", "set_markup"]
        );
        assert_eq!(widget.position, Position::new(30, 40));
        assert_eq!(widget.parent, Some(Layer::Background));
        assert!(widget.markup.as_deref().unwrap().contains("Only entry"));
        assert_eq!(overlay.next_deadline(), Some(now + Duration::from_secs(30 * 60)));
        assert_eq!(overlay.store().subscribers.len(), 1);
        assert_eq!(overlay.entry_count(), 1);
    }

    #[test]
    fn test_start_with_missing_content_shows_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let widget = Rc::new(RefCell::new(RecordingSurface::default()));
        let handle = widget.clone();
        let mut overlay = Overlay::new(MemoryStore::default());
        let (_, listener) = counter();

        overlay
            .start(&dir.path().join("missing.json"), move |_| Ok(SharedSurface(handle)), listener, Instant::now())
            .unwrap();
        assert_eq!(
            widget.borrow().markup.as_deref(),
            Some(crate::constants::content::NO_CONTENT_MESSAGE)
        );
    }

    #[test]
    fn test_failed_start_rolls_back() {
        let file = content_file(ONE_ENTRY);
        let widget = Rc::new(RefCell::new(RecordingSurface {
            fail_attach: true,
            ..Default::default()
        }));
        let handle = widget.clone();
        let mut overlay = Overlay::new(MemoryStore::default());
        let (_, listener) = counter();

        let result = overlay.start(file.path(), move |_| Ok(SharedSurface(handle)), listener, Instant::now());
        assert!(result.is_err());
        assert!(!overlay.is_running());
        assert_eq!(overlay.next_deadline(), None);
        assert_eq!(overlay.store().subscribers.len(), 0);
        assert_eq!(overlay.entry_count(), 0);
        assert_eq!(widget.borrow().calls.last(), Some(&"dropped"));
    }

    #[test]
    fn test_failed_widget_construction() {
        let file = content_file(ONE_ENTRY);
        let mut overlay: Overlay<SharedSurface, MemoryStore> = Overlay::new(MemoryStore::default());
        let (_, listener) = counter();

        let result = overlay.start(file.path(), |_| anyhow::bail!("no display"), listener, Instant::now());
        assert!(result.is_err());
        assert_eq!(overlay.entry_count(), 0);
        overlay.shutdown();
    }

    #[test]
    fn test_settings_change_recomputes_everything() {
        let (mut overlay, widget, now) = started(Settings::default(), ONE_ENTRY);
        widget.borrow_mut().calls.clear();

        overlay.store_mut().external_edit(|s| {
            s.always_on_top = true;
            s.refresh_interval = 5;
            s.position_x = 7;
            s.font_size = 20;
        });
        let later = now + Duration::from_secs(60);
        overlay.on_settings_changed(later).unwrap();

        let w = widget.borrow();
        assert_eq!(
            w.calls,
            vec!["apply_style", "set_position", "detach", "untrack", "attach", "set_markup"]
        );
        assert_eq!(w.parent, Some(Layer::Topmost));
        assert_eq!(w.attachments(), 1);
        assert_eq!(w.position.x, 7);
        assert_eq!(w.style.as_ref().unwrap().font_size, 20.0);
        assert_eq!(overlay.next_deadline(), Some(later + Duration::from_secs(5 * 60)));
    }

    #[test]
    fn test_settings_change_continues_past_failed_step() {
        let (mut overlay, widget, now) = started(Settings::default(), ONE_ENTRY);
        {
            let mut w = widget.borrow_mut();
            w.calls.clear();
            w.fail_style = true;
        }

        overlay.store_mut().external_edit(|s| {
            s.always_on_top = true;
            s.refresh_interval = 10;
            s.position_y = 90;
        });
        let later = now + Duration::from_secs(60);
        assert!(overlay.on_settings_changed(later).is_err());

        let w = widget.borrow();
        assert_eq!(
            w.calls,
            vec!["apply_style", "set_position", "detach", "untrack", "attach", "set_markup"]
        );
        assert_eq!(w.position.y, 90);
        assert_eq!(w.parent, Some(Layer::Topmost));
        assert_eq!(overlay.next_deadline(), Some(later + Duration::from_secs(10 * 60)));
    }

    #[test]
    fn test_unchanged_settings_notification_is_harmless() {
        let (mut overlay, widget, now) = started(Settings::default(), ONE_ENTRY);
        overlay.on_settings_changed(now).unwrap();
        overlay.on_settings_changed(now).unwrap();

        let w = widget.borrow();
        assert_eq!(w.parent, Some(Layer::Background));
        assert_eq!(w.attachments(), 1);
        assert_eq!(overlay.next_deadline(), Some(now + Duration::from_secs(30 * 60)));
    }

    #[test]
    fn test_tick_renders_only_when_due() {
        let (mut overlay, widget, now) = started(Settings::default(), ONE_ENTRY);
        widget.borrow_mut().calls.clear();

        assert!(!overlay.on_tick(now + Duration::from_secs(60)).unwrap());
        assert!(widget.borrow().calls.is_empty());

        assert!(overlay.on_tick(now + Duration::from_secs(30 * 60)).unwrap());
        assert_eq!(widget.borrow().calls, vec!["set_markup"]);
    }

    #[test]
    fn test_refresh_now_keeps_timer() {
        let (mut overlay, widget, now) = started(Settings::default(), ONE_ENTRY);
        let deadline = overlay.next_deadline();
        widget.borrow_mut().calls.clear();

        overlay.refresh_now().unwrap();
        assert_eq!(widget.borrow().calls, vec!["set_markup"]);
        assert_eq!(overlay.next_deadline(), deadline);
        assert!(deadline > Some(now));
    }

    #[test]
    fn test_pointer_drag_persists_through_store() {
        let (mut overlay, _widget, _) = started(Settings::default(), ONE_ENTRY);

        let press = PointerEvent::ButtonPress { button: 1, x: 10.0, y: 10.0 };
        assert_eq!(overlay.handle_pointer(press).unwrap(), Propagation::Stop);
        assert!(overlay.is_dragging());
        overlay.handle_pointer(PointerEvent::Motion { x: 15.0, y: 17.0 }).unwrap();
        overlay
            .handle_pointer(PointerEvent::ButtonRelease { button: 1, x: 15.0, y: 17.0 })
            .unwrap();

        let snapshot = overlay.store().snapshot();
        assert_eq!(snapshot.position(), Position::new(105, 107));
    }

    #[test]
    fn test_pointer_before_start_propagates() {
        let mut overlay: Overlay<SharedSurface, MemoryStore> = Overlay::new(MemoryStore::default());
        let press = PointerEvent::ButtonPress { button: 1, x: 0.0, y: 0.0 };
        assert_eq!(overlay.handle_pointer(press).unwrap(), Propagation::Propagate);
    }

    #[test]
    fn test_shutdown_order_and_idempotence() {
        let (mut overlay, widget, _) = started(Settings::default(), ONE_ENTRY);
        overlay.attach_indicator(Box::new(TestIndicator(widget.clone())));
        widget.borrow_mut().calls.clear();

        overlay.shutdown();
        assert_eq!(widget.borrow().calls, vec!["detach", "dropped", "indicator_released"]);
        assert_eq!(widget.borrow().attachments(), 0);
        assert_eq!(overlay.next_deadline(), None);
        assert_eq!(overlay.store().subscribers.len(), 0);
        assert_eq!(overlay.entry_count(), 0);

        overlay.shutdown();
        assert_eq!(widget.borrow().calls.len(), 3);
        assert!(overlay.on_settings_changed(Instant::now()).is_ok());
        assert!(overlay.refresh_now().is_ok());
    }

    #[test]
    fn test_shutdown_before_start() {
        let mut overlay: Overlay<SharedSurface, MemoryStore> = Overlay::new(MemoryStore::default());
        overlay.shutdown();
        overlay.shutdown();
        assert!(!overlay.is_running());
    }

    #[test]
    fn test_subscription_listener_fires_on_external_edit() {
        let file = content_file(ONE_ENTRY);
        let widget = Rc::new(RefCell::new(RecordingSurface::default()));
        let handle = widget.clone();
        let mut overlay = Overlay::new(MemoryStore::default());
        let (calls, listener) = counter();
        overlay
            .start(file.path(), move |_| Ok(SharedSurface(handle)), listener, Instant::now())
            .unwrap();

        overlay.store_mut().external_edit(|s| s.show_source = false);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        overlay.shutdown();
        overlay.store_mut().external_edit(|s| s.show_source = true);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
